//! # docbridge
//!
//! Provider-neutral query translation and transactional execution for
//! document databases.
//!
//! Domain code describes filters as [`ConditionExpression`]s over logical
//! field names. A [`QueryBuilder`] turns them into native MongoDB commands,
//! and a [`CollectionAdapter`] runs those commands through a
//! [`DocumentDriver`], inside the active transaction when there is one.
//! Driver failures surface as classified [`AdapterError`]s.
//!
//! ## Crates
//!
//! - [`query`] - conditions, operator translation and command building
//! - [`mongodb`] - driver abstraction, adapter, sessions and error classification
//! - [`conf`] - connection settings read from the environment (feature `conf`)
//!
//! ## Feature Flags
//!
//! - `conf` (default) - environment-driven [`ConnectionSettings`] and
//!   `MongoDriver::connect`
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docbridge::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConnectionSettings::from_env(None)?;
//! let driver = Arc::new(MongoDriver::connect(&settings).await?);
//! let orders = CollectionAdapter::new(driver, "orders")
//!     .with_identity(IdentityMapping::new("id"));
//!
//! orders
//!     .with_transaction(|| async {
//!         orders.insert(vec![bson::doc! { "id": "o-1", "total": 40 }]).await?;
//!         orders
//!             .update(
//!                 &[bson::doc! { "status": "open" }],
//!                 &[Some(field("total").gte(10).into())],
//!                 &["UpdateMany"],
//!             )
//!             .await
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use docbridge_mongodb as mongodb;
pub use docbridge_query as query;

#[cfg(feature = "conf")]
pub use docbridge_conf as conf;

pub use docbridge_query::{
	AggregationParams, ConditionExpression, ConditionTranslator, CountParams, FieldCondition,
	FieldMap, FieldMapping, FieldResolver, FindParams, Operator, QueryBuilder, QueryError,
	RemoveParams, UpdateMethod,
};

pub use docbridge_mongodb::{
	AdapterError, CollectionAdapter, DocumentDriver, DriverError, ErrorClassifier,
	IdentityMapping, IndexSpec, MongoDriver, OperationStatus, RemoveOutcome, SessionErrorKind,
	SessionOperation, TransactionalSession, UpdateOutcome,
};

#[cfg(feature = "conf")]
pub use docbridge_conf::{ConfigError, ConnectionSettings};

/// Commonly used types
pub mod prelude {
	pub use crate::{
		AdapterError, AggregationParams, CollectionAdapter, ConditionExpression, CountParams,
		DocumentDriver, FindParams, IdentityMapping, IndexSpec, MongoDriver, OperationStatus,
		RemoveParams,
	};
	pub use docbridge_query::condition::{and, field, or};

	#[cfg(feature = "conf")]
	pub use crate::ConnectionSettings;
}
