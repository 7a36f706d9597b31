//! Driver error classification
//!
//! Every failure reported by a [`DocumentDriver`](crate::DocumentDriver)
//! passes through [`ErrorClassifier`] before it leaves the adapter. The
//! checks run in a fixed order and the first match wins:
//!
//! 1. duplicate key (`11000`, `11001` or an `E11000` message)
//! 2. schema validation failure (`121`)
//! 3. transaction-labelled failure
//! 4. anything else, wrapped as [`AdapterError::Driver`]

use std::sync::LazyLock;

use regex::Regex;

use crate::driver::{DriverError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use crate::error::{AdapterError, SessionErrorKind, SessionOperation};

const DUPLICATE_KEY_CODES: [i32; 2] = [11000, 11001];
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;

/// `dup key: { <body> }`; braces inside quoted values do not close the body
static DUP_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r#"dup key: \{\s*((?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[^"'])*?)\s*\}(?:\s|$|,|\))"#,
	)
	.expect("DUP_KEY_RE: invalid regex pattern")
});

/// One `field: value` pair inside a dup key body; quoted values may contain commas
static DUP_KEY_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([^:,\s][^:,]*?)\s*:\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[^,]+)"#)
		.expect("DUP_KEY_PAIR_RE: invalid regex pattern")
});

/// Maps raw driver errors onto [`AdapterError`] kinds
pub struct ErrorClassifier;

impl ErrorClassifier {
	/// Classify a failure of a collection command
	///
	/// # Examples
	///
	/// ```
	/// use docbridge_mongodb::{AdapterError, DriverError, ErrorClassifier};
	///
	/// let raw = DriverError::new(
	///     r#"E11000 duplicate key error collection: app.users index: _id_ dup key: { _id: "X" }"#,
	/// )
	/// .with_code(11000);
	///
	/// match ErrorClassifier::classify(raw) {
	///     AdapterError::DuplicateKey { ids, .. } => assert_eq!(ids, vec!["X".to_string()]),
	///     other => panic!("unexpected {other:?}"),
	/// }
	/// ```
	pub fn classify(error: DriverError) -> AdapterError {
		let classified = if is_duplicate_key(&error) {
			AdapterError::DuplicateKey {
				ids: duplicate_ids(&error),
				source: error,
			}
		} else if is_validation_failure(&error) {
			AdapterError::InvalidData { source: error }
		} else if let Some(kind) = labelled_session_kind(&error) {
			AdapterError::Session {
				kind,
				operation: SessionOperation::Execute,
				source: error,
			}
		} else {
			AdapterError::Driver(error)
		};

		tracing::warn!(error = %classified, "Driver operation failed");
		classified
	}

	/// Classify a failure of a session lifecycle step
	///
	/// The result is always [`AdapterError::Session`], sub-classified by the
	/// error's labels.
	pub fn classify_session(error: DriverError, operation: SessionOperation) -> AdapterError {
		let kind = labelled_session_kind(&error).unwrap_or(SessionErrorKind::Other);
		tracing::warn!(%operation, %kind, error = %error, "Session operation failed");

		AdapterError::Session {
			kind,
			operation,
			source: error,
		}
	}

	/// Key values named in every `dup key: { .. }` fragment of the error
	///
	/// Surrounding quotes are stripped; duplicates are reported once.
	pub fn duplicate_ids(error: &DriverError) -> Vec<String> {
		duplicate_ids(error)
	}
}

fn is_duplicate_key(error: &DriverError) -> bool {
	error.codes().any(|code| DUPLICATE_KEY_CODES.contains(&code))
		|| error.messages().any(|message| message.contains("E11000"))
}

fn is_validation_failure(error: &DriverError) -> bool {
	error.codes().any(|code| code == DOCUMENT_VALIDATION_FAILURE)
		|| error.code_name.as_deref() == Some("DocumentValidationFailure")
}

fn labelled_session_kind(error: &DriverError) -> Option<SessionErrorKind> {
	if error.has_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
		Some(SessionErrorKind::UnknownCommitResult)
	} else if error.has_label(TRANSIENT_TRANSACTION_ERROR) {
		Some(SessionErrorKind::TransientTransaction)
	} else {
		None
	}
}

fn duplicate_ids(error: &DriverError) -> Vec<String> {
	let mut ids: Vec<String> = Vec::new();

	for message in error.messages() {
		for fragment in DUP_KEY_RE.captures_iter(message) {
			for pair in DUP_KEY_PAIR_RE.captures_iter(&fragment[1]) {
				let id = strip_quotes(pair[2].trim());
				if !ids.iter().any(|known| known == id) {
					ids.push(id.to_string());
				}
			}
		}
	}

	ids
}

fn strip_quotes(value: &str) -> &str {
	for quote in ['"', '\''] {
		if let Some(inner) = value
			.strip_prefix(quote)
			.and_then(|rest| rest.strip_suffix(quote))
		{
			return inner;
		}
	}
	value
}
