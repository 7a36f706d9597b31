//! # docbridge MongoDB adapter
//!
//! Executes provider-neutral queries and mutations against MongoDB.
//!
//! ## Overview
//!
//! - **[`CollectionAdapter`]**: find, count, aggregate, update, insert and
//!   remove on one collection, with provider-neutral outcomes
//! - **[`TransactionalSession`]**: at most one active transaction per
//!   adapter, with start, commit and rollback
//! - **[`ErrorClassifier`]**: maps raw driver failures onto
//!   [`AdapterError`] kinds (duplicate key, invalid data, session, generic)
//! - **[`DocumentDriver`]**: the driver seam, implemented for MongoDB by
//!   [`MongoDriver`]
//!
//! ## Transactions
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bson::doc;
//! use docbridge_mongodb::{CollectionAdapter, IdentityMapping, MongoDriver};
//! use docbridge_query::condition::field;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Arc::new(MongoDriver::with_uri("mongodb://localhost:27017/?replicaSet=rs0", "shop").await?);
//! let orders = CollectionAdapter::new(Arc::clone(&driver), "orders")
//!     .with_identity(IdentityMapping::new("id"));
//!
//! orders
//!     .with_transaction(|| async {
//!         orders.insert(vec![doc! { "sku": "A-1", "qty": 2 }]).await?;
//!         orders
//!             .update(
//!                 &[doc! { "status": "reserved" }],
//!                 &[Some(field("sku").eq("A-1").into())],
//!                 &["UpdateMany"],
//!             )
//!             .await?;
//!         Ok(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `conf`: `MongoDriver::connect` from `docbridge-conf` settings

pub mod adapter;
pub mod backends;
pub mod classifier;
pub mod driver;
pub mod error;
pub mod identity;
pub mod outcome;
pub mod session;

pub use adapter::CollectionAdapter;
pub use backends::MongoDriver;
pub use classifier::ErrorClassifier;
pub use driver::{
	BulkUpdateSummary, DeleteSummary, DocumentDriver, DriverError, DriverResult,
	InsertManySummary, IndexSpec, NAMESPACE_NOT_FOUND, TRANSIENT_TRANSACTION_ERROR,
	UNKNOWN_TRANSACTION_COMMIT_RESULT, UpdateSummary, WriteErrorDetail,
};
pub use error::{AdapterError, Result, SessionErrorKind, SessionOperation};
pub use identity::IdentityMapping;
pub use outcome::{OperationStatus, RemoveOutcome, UpdateOutcome};
pub use session::TransactionalSession;
