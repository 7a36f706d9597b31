//! Adapter error taxonomy

use std::fmt;

use docbridge_query::QueryError;

use crate::classifier::ErrorClassifier;
use crate::driver::{BulkUpdateSummary, DriverError};

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Sub-kind of a session failure, taken from the driver's error labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionErrorKind {
	/// The commit may or may not have been applied
	UnknownCommitResult,
	/// The transaction may succeed if retried from the start
	TransientTransaction,
	Other,
}

impl fmt::Display for SessionErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionErrorKind::UnknownCommitResult => write!(f, "unknown commit result"),
			SessionErrorKind::TransientTransaction => write!(f, "transient transaction error"),
			SessionErrorKind::Other => write!(f, "session error"),
		}
	}
}

/// Step of the session lifecycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOperation {
	Start,
	/// A command executed inside the transaction
	Execute,
	Commit,
	Abort,
}

impl fmt::Display for SessionOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionOperation::Start => write!(f, "start"),
			SessionOperation::Execute => write!(f, "execute"),
			SessionOperation::Commit => write!(f, "commit"),
			SessionOperation::Abort => write!(f, "abort"),
		}
	}
}

/// Errors returned by the adapter
///
/// Driver failures are always converted through [`ErrorClassifier`]; the
/// `From<DriverError>` impl does exactly that, so `?` on a driver call
/// yields a classified error.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
	/// Malformed request, rejected before reaching the database
	#[error(transparent)]
	Query(#[from] QueryError),

	#[error("Duplicate key: {ids:?}")]
	DuplicateKey {
		/// Key values parsed from the server message
		ids: Vec<String>,
		source: DriverError,
	},

	/// Document failed schema validation
	#[error("Invalid data: {source}")]
	InvalidData { source: DriverError },

	/// A transaction is already active on this adapter
	#[error("A transaction is already in progress")]
	PendingSession,

	#[error("Session {operation} failed ({kind}): {source}")]
	Session {
		kind: SessionErrorKind,
		operation: SessionOperation,
		source: DriverError,
	},

	/// Raw bulk operations other than `updateOne`/`updateMany`
	#[error("Unsupported bulk update operations: {found:?}")]
	BulkUpdateOperations { found: Vec<String> },

	/// Any other driver failure
	#[error("Driver error: {0}")]
	Driver(#[source] DriverError),
}

impl AdapterError {
	/// Whether a higher layer may retry the transaction
	///
	/// Nothing in this crate retries on its own.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			AdapterError::Session {
				kind: SessionErrorKind::TransientTransaction | SessionErrorKind::UnknownCommitResult,
				..
			}
		)
	}

	/// The underlying driver error, if any
	pub fn driver_error(&self) -> Option<&DriverError> {
		match self {
			AdapterError::DuplicateKey { source, .. }
			| AdapterError::InvalidData { source }
			| AdapterError::Session { source, .. } => Some(source),
			AdapterError::Driver(source) => Some(source),
			AdapterError::Query(_)
			| AdapterError::PendingSession
			| AdapterError::BulkUpdateOperations { .. } => None,
		}
	}

	/// Bulk update operations applied before a non-transactional bulk failed
	pub fn applied_updates(&self) -> Option<&BulkUpdateSummary> {
		self.driver_error().and_then(|e| e.applied.as_ref())
	}
}

impl From<DriverError> for AdapterError {
	fn from(error: DriverError) -> Self {
		ErrorClassifier::classify(error)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(SessionErrorKind::TransientTransaction, true)]
	#[case(SessionErrorKind::UnknownCommitResult, true)]
	#[case(SessionErrorKind::Other, false)]
	fn test_session_errors_retryable(#[case] kind: SessionErrorKind, #[case] retryable: bool) {
		let err = AdapterError::Session {
			kind,
			operation: SessionOperation::Commit,
			source: DriverError::new("commit failed"),
		};
		assert_eq!(err.is_retryable(), retryable);
	}

	#[rstest]
	fn test_other_errors_not_retryable() {
		assert!(!AdapterError::PendingSession.is_retryable());
		assert!(!AdapterError::Driver(DriverError::new("x")).is_retryable());
		assert!(
			!AdapterError::Query(QueryError::UnsupportedOperator("like".into())).is_retryable()
		);
	}

	#[rstest]
	fn test_display() {
		let err = AdapterError::Session {
			kind: SessionErrorKind::UnknownCommitResult,
			operation: SessionOperation::Commit,
			source: DriverError::new("timed out"),
		};
		assert_eq!(
			err.to_string(),
			"Session commit failed (unknown commit result): timed out"
		);
		assert_eq!(
			AdapterError::BulkUpdateOperations {
				found: vec!["deleteOne".into()]
			}
			.to_string(),
			"Unsupported bulk update operations: [\"deleteOne\"]"
		);
	}

	#[rstest]
	fn test_driver_error_accessor() {
		let err = AdapterError::InvalidData {
			source: DriverError::new("bad").with_code(121),
		};
		assert_eq!(err.driver_error().and_then(|e| e.code), Some(121));
		assert!(AdapterError::PendingSession.driver_error().is_none());
	}

	#[rstest]
	fn test_applied_updates_survive_classification() {
		let applied = BulkUpdateSummary {
			matched_count: 2,
			modified_count: 1,
			..Default::default()
		};
		let raw = DriverError::new(
			r#"E11000 duplicate key error collection: app.users index: email_1 dup key: { email: "a@x" }"#,
		)
		.with_code(11000)
		.with_applied(applied.clone());

		let err = AdapterError::from(raw);

		assert!(matches!(err, AdapterError::DuplicateKey { .. }));
		assert_eq!(err.applied_updates(), Some(&applied));
		assert_eq!(
			AdapterError::from(DriverError::new("x")).applied_updates(),
			None
		);
	}
}
