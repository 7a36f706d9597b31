//! Identity field mapping
//!
//! Domain entities usually name their identifier `id` while MongoDB keeps
//! it under `_id`. [`IdentityMapping`] renames the field on the way in and
//! out of the database.

use bson::{Bson, Document};
use docbridge_query::{FieldMap, ID_FIELD};

/// Renames a logical identity field to `_id` and back
///
/// # Examples
///
/// ```
/// use bson::{Bson, doc};
/// use docbridge_mongodb::IdentityMapping;
///
/// let identity = IdentityMapping::new("id");
///
/// assert_eq!(identity.to_native(doc! { "id": 7, "name": "a" }), doc! { "name": "a", "_id": 7 });
/// assert_eq!(identity.to_native(doc! { "id": Bson::Null, "name": "a" }), doc! { "name": "a" });
/// assert_eq!(identity.from_native(doc! { "_id": 7, "name": "a" }), doc! { "name": "a", "id": 7 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapping {
	field: String,
}

impl IdentityMapping {
	pub fn new(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
		}
	}

	/// Logical name of the identity field
	pub fn field(&self) -> &str {
		&self.field
	}

	/// Prepare a document for insert
	///
	/// A null identifier is dropped so the database assigns one.
	pub fn to_native(&self, mut document: Document) -> Document {
		match document.remove(&self.field) {
			None | Some(Bson::Null) => {}
			Some(id) => {
				document.insert(ID_FIELD, id);
			}
		}
		document
	}

	/// Rename `_id` back to the logical field of a document read from the database
	pub fn from_native(&self, mut document: Document) -> Document {
		if self.field != ID_FIELD
			&& let Some(id) = document.remove(ID_FIELD)
		{
			document.insert(self.field.clone(), id);
		}
		document
	}

	/// Field map translating filters on the logical field to `_id`
	pub fn field_map(&self) -> FieldMap {
		FieldMap::new().identity(self.field.clone())
	}
}
