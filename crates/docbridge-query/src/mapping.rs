//! Logical-to-native field mapping
//!
//! Entities rarely store fields under the names domain code uses for them.
//! A [`FieldResolver`] tells the translator which native key a logical field
//! lives under and how its values are converted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bson::Bson;
use bson::oid::ObjectId;

/// Key MongoDB uses for document identity
pub const ID_FIELD: &str = "_id";

/// Conversion applied to a value before it is written into a native clause
pub type ValueTransform = Arc<dyn Fn(Bson) -> Bson + Send + Sync>;

/// Native location and value conversion of one logical field
#[derive(Clone)]
pub struct FieldMapping {
	native_key: String,
	transform: Option<ValueTransform>,
}

impl FieldMapping {
	/// Store the field under `native_key`, values untouched
	pub fn rename(native_key: impl Into<String>) -> Self {
		Self {
			native_key: native_key.into(),
			transform: None,
		}
	}

	/// Store the field under `native_key`, converting hex strings to `ObjectId`
	///
	/// Strings that are not valid object ids are passed through.
	///
	/// # Examples
	///
	/// ```
	/// use bson::Bson;
	/// use docbridge_query::FieldMapping;
	///
	/// let mapping = FieldMapping::object_id("_id");
	/// let converted = mapping.apply(Bson::String("65a1f0c2e4b0a1b2c3d4e5f6".into()));
	/// assert!(matches!(converted, Bson::ObjectId(_)));
	/// assert_eq!(mapping.apply(Bson::String("legacy".into())), Bson::String("legacy".into()));
	/// ```
	pub fn object_id(native_key: impl Into<String>) -> Self {
		Self::rename(native_key).with_transform(|value| match value {
			Bson::String(hex) => match ObjectId::parse_str(&hex) {
				Ok(oid) => Bson::ObjectId(oid),
				Err(_) => Bson::String(hex),
			},
			other => other,
		})
	}

	/// Attach a value conversion
	pub fn with_transform<F>(mut self, transform: F) -> Self
	where
		F: Fn(Bson) -> Bson + Send + Sync + 'static,
	{
		self.transform = Some(Arc::new(transform));
		self
	}

	pub fn native_key(&self) -> &str {
		&self.native_key
	}

	/// Run the value conversion, if any
	pub fn apply(&self, value: Bson) -> Bson {
		match &self.transform {
			Some(transform) => transform(value),
			None => value,
		}
	}
}

impl fmt::Debug for FieldMapping {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldMapping")
			.field("native_key", &self.native_key)
			.field("transform", &self.transform.is_some())
			.finish()
	}
}

/// Capability to resolve a logical field name to its native mapping
///
/// Returning `None` means the field is stored under its logical name with
/// values unchanged.
pub trait FieldResolver: Send + Sync {
	fn lookup_field(&self, name: &str) -> Option<FieldMapping>;
}

/// In-memory [`FieldResolver`]
///
/// # Examples
///
/// ```
/// use docbridge_query::{FieldMap, FieldMapping, FieldResolver};
///
/// let map = FieldMap::new()
///     .identity("id")
///     .map("createdAt", FieldMapping::rename("created_at"));
///
/// assert_eq!(map.lookup_field("id").unwrap().native_key(), "_id");
/// assert_eq!(map.lookup_field("createdAt").unwrap().native_key(), "created_at");
/// assert!(map.lookup_field("name").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
	fields: HashMap<String, FieldMapping>,
}

impl FieldMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a mapping for `field`
	pub fn map(mut self, field: impl Into<String>, mapping: FieldMapping) -> Self {
		self.fields.insert(field.into(), mapping);
		self
	}

	/// Store the logical identity field under `_id`
	pub fn identity(self, field: impl Into<String>) -> Self {
		self.map(field, FieldMapping::rename(ID_FIELD))
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

impl FieldResolver for FieldMap {
	fn lookup_field(&self, name: &str) -> Option<FieldMapping> {
		self.fields.get(name).cloned()
	}
}
