//! # docbridge query
//!
//! Provider-neutral query conditions and their translation into MongoDB
//! command documents.
//!
//! ## Overview
//!
//! - **[`ConditionExpression`]**: tree of field comparisons joined by AND/OR,
//!   built with the helpers in [`condition`] or parsed from the dynamic
//!   document form
//! - **[`OperatorTranslator`]**: abstract operators to native `$` tokens
//! - **[`ConditionTranslator`]**: recursive lowering of a condition into a
//!   filter document, optionally through a [`FieldResolver`]
//! - **[`QueryBuilder`]**: find, count, remove, update and aggregation
//!   command parameters
//!
//! Everything in this crate is pure: no I/O, no shared mutable state.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bson::doc;
//! use docbridge_query::condition::field;
//! use docbridge_query::{ConditionTranslator, FieldMap, FindParams, QueryBuilder};
//!
//! let fields = FieldMap::new().identity("id");
//! let builder = QueryBuilder::new(ConditionTranslator::with_resolver(Arc::new(fields)));
//!
//! let command = builder
//!     .build_find(
//!         &FindParams::new()
//!             .filter(vec![field("id").eq("abc"), field("age").between(18, 30)])
//!             .limit(5),
//!     )
//!     .unwrap();
//!
//! assert_eq!(
//!     command.filter,
//!     doc! { "_id": { "$eq": "abc" }, "age": { "$gte": 18, "$lte": 30 } }
//! );
//! assert_eq!(command.options.limit, Some(5));
//! ```

pub mod builder;
pub mod condition;
pub mod error;
pub mod mapping;
pub mod operator;
pub mod translator;

pub use builder::{
	AggregationParams, BulkUpdateOperation, CountCommand, CountOptions, CountParams, FindCommand,
	FindOptions, FindParams, QueryBuilder, RemoveCommand, RemoveParams, SingleUpdate,
	UpdateCommand, UpdateMethod, UpdateOptions,
};
pub use condition::{ConditionExpression, FieldCondition, Predicate};
pub use error::{QueryError, Result};
pub use mapping::{FieldMap, FieldMapping, FieldResolver, ID_FIELD, ValueTransform};
pub use operator::{Connective, Operator, OperatorTranslator};
pub use translator::ConditionTranslator;
