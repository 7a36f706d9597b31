//! Driver seam
//!
//! [`DocumentDriver`] is the narrow surface the adapter needs from a document
//! database: collection commands, optionally bound to a session, and the
//! session lifecycle itself. [`MongoDriver`](crate::MongoDriver) implements it
//! on top of the official MongoDB driver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bson::{Bson, Document};
use docbridge_query::{BulkUpdateOperation, CountOptions, FindOptions, SingleUpdate};

/// Error label MongoDB attaches to errors that may succeed if the whole
/// transaction is retried
pub const TRANSIENT_TRANSACTION_ERROR: &str = "TransientTransactionError";

/// Error label MongoDB attaches when the outcome of a commit is unknown
pub const UNKNOWN_TRANSACTION_COMMIT_RESULT: &str = "UnknownTransactionCommitResult";

/// Server code for a command on a collection or database that does not exist
pub const NAMESPACE_NOT_FOUND: i32 = 26;

/// Result type for raw driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A write error reported for a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteErrorDetail {
	pub code: i32,
	pub message: String,
}

/// Raw failure reported by a driver
///
/// Carries what the classifier needs: server error code, code name, error
/// labels and messages. It never leaves the adapter unclassified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
	pub code: Option<i32>,
	pub code_name: Option<String>,
	pub labels: Vec<String>,
	pub message: String,
	pub write_errors: Vec<WriteErrorDetail>,
	/// Updates already applied when a bulk update failed part way
	pub applied: Option<BulkUpdateSummary>,
}

impl DriverError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			code: None,
			code_name: None,
			labels: Vec::new(),
			message: message.into(),
			write_errors: Vec::new(),
			applied: None,
		}
	}

	pub fn with_code(mut self, code: i32) -> Self {
		self.code = Some(code);
		self
	}

	pub fn with_code_name(mut self, code_name: impl Into<String>) -> Self {
		self.code_name = Some(code_name.into());
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.labels.push(label.into());
		self
	}

	pub fn with_write_error(mut self, code: i32, message: impl Into<String>) -> Self {
		self.write_errors.push(WriteErrorDetail {
			code,
			message: message.into(),
		});
		self
	}

	/// Record the bulk update operations that ran before this failure
	pub fn with_applied(mut self, applied: BulkUpdateSummary) -> Self {
		self.applied = Some(applied);
		self
	}

	pub fn has_label(&self, label: &str) -> bool {
		self.labels.iter().any(|l| l == label)
	}

	/// Top-level code followed by the codes of individual write errors
	pub fn codes(&self) -> impl Iterator<Item = i32> + '_ {
		self.code
			.into_iter()
			.chain(self.write_errors.iter().map(|e| e.code))
	}

	/// Top-level message followed by the messages of individual write errors
	pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
		std::iter::once(self.message.as_str())
			.chain(self.write_errors.iter().map(|e| e.message.as_str()))
	}

	pub fn is_namespace_not_found(&self) -> bool {
		self.code == Some(NAMESPACE_NOT_FOUND)
	}
}

/// Result of a single update call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
	pub matched_count: u64,
	pub modified_count: u64,
	pub upserted_id: Option<Bson>,
}

/// Result of a bulk update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkUpdateSummary {
	pub matched_count: u64,
	pub modified_count: u64,
	pub upserted_count: u64,
	pub upserted_ids: Vec<Bson>,
}

impl BulkUpdateSummary {
	/// Add the result of one operation of the bulk
	pub fn record(&mut self, update: UpdateSummary) {
		self.matched_count += update.matched_count;
		self.modified_count += update.modified_count;
		if let Some(id) = update.upserted_id {
			self.upserted_count += 1;
			self.upserted_ids.push(id);
		}
	}
}

/// Identifiers assigned by an insert, keyed by input position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertManySummary {
	pub inserted_ids: BTreeMap<usize, Bson>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
	pub acknowledged: bool,
	pub deleted_count: u64,
}

/// Index to provision on a collection
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
	pub name: String,
	pub keys: Document,
	pub unique: bool,
}

impl IndexSpec {
	pub fn new(name: impl Into<String>, keys: Document) -> Self {
		Self {
			name: name.into(),
			keys,
			unique: false,
		}
	}

	pub fn unique(mut self) -> Self {
		self.unique = true;
		self
	}
}

/// Operations a document database driver provides to the adapter
///
/// Collection commands take an optional session; when one is given the
/// command runs inside that session's transaction.
#[async_trait]
pub trait DocumentDriver: Send + Sync {
	/// Driver-side session handle
	type Session: Send;

	async fn start_session(&self) -> DriverResult<Self::Session>;

	async fn start_transaction(&self, session: &mut Self::Session) -> DriverResult<()>;

	async fn commit_transaction(&self, session: &mut Self::Session) -> DriverResult<()>;

	async fn abort_transaction(&self, session: &mut Self::Session) -> DriverResult<()>;

	/// Release the session; never fails
	async fn end_session(&self, session: Self::Session);

	async fn find(
		&self,
		collection: &str,
		filter: Document,
		options: FindOptions,
		session: Option<&mut Self::Session>,
	) -> DriverResult<Vec<Document>>;

	async fn count_documents(
		&self,
		collection: &str,
		filter: Document,
		options: CountOptions,
		session: Option<&mut Self::Session>,
	) -> DriverResult<u64>;

	async fn aggregate(
		&self,
		collection: &str,
		pipeline: Vec<Document>,
		session: Option<&mut Self::Session>,
	) -> DriverResult<Vec<Document>>;

	async fn update(
		&self,
		collection: &str,
		update: SingleUpdate,
		session: Option<&mut Self::Session>,
	) -> DriverResult<UpdateSummary>;

	async fn bulk_update(
		&self,
		collection: &str,
		operations: Vec<BulkUpdateOperation>,
		session: Option<&mut Self::Session>,
	) -> DriverResult<BulkUpdateSummary>;

	async fn insert_many(
		&self,
		collection: &str,
		documents: Vec<Document>,
		session: Option<&mut Self::Session>,
	) -> DriverResult<InsertManySummary>;

	async fn delete_many(
		&self,
		collection: &str,
		filter: Document,
		session: Option<&mut Self::Session>,
	) -> DriverResult<DeleteSummary>;

	async fn list_index_names(&self, collection: &str) -> DriverResult<Vec<String>>;

	/// Create `indexes`, returning the names the server reports
	async fn create_indexes(
		&self,
		collection: &str,
		indexes: Vec<IndexSpec>,
	) -> DriverResult<Vec<String>>;
}
