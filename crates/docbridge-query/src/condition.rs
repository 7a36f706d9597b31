//! Provider-neutral condition expressions
//!
//! A [`ConditionExpression`] is a tree of field comparisons combined by
//! logical connectives. It is built by domain code, usually through the
//! fluent helpers in this module, and handed to the
//! [`ConditionTranslator`](crate::ConditionTranslator) which lowers it into a
//! native filter document.
//!
//! ```rust
//! use docbridge_query::condition::{and, field, or};
//!
//! let adults_or_admins = or([
//!     field("age").gte(18).into(),
//!     field("role").eq("admin").into(),
//! ]);
//! let active = and([adults_or_admins, field("deleted_at").is_null().into()]);
//! # let _ = active;
//! ```

use bson::{Bson, Document};

use crate::error::{QueryError, Result};
use crate::operator::{Connective, Operator};

/// One operator/value pair applied to a field
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
	pub operator: Operator,
	pub value: Bson,
}

/// All predicates applied to a single field
///
/// Several predicates under one field form a compound leaf, e.g. a range
/// with a lower and an upper bound.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
	pub field: String,
	pub predicates: Vec<Predicate>,
}

impl FieldCondition {
	/// Create a field condition without predicates
	pub fn new(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			predicates: Vec::new(),
		}
	}

	/// Add an arbitrary operator/value pair
	pub fn with(mut self, operator: Operator, value: impl Into<Bson>) -> Self {
		self.predicates.push(Predicate {
			operator,
			value: value.into(),
		});
		self
	}

	pub fn eq(self, value: impl Into<Bson>) -> Self {
		self.with(Operator::Eq, value)
	}

	pub fn ne(self, value: impl Into<Bson>) -> Self {
		self.with(Operator::Ne, value)
	}

	pub fn gt(self, value: impl Into<Bson>) -> Self {
		self.with(Operator::Gt, value)
	}

	pub fn gte(self, value: impl Into<Bson>) -> Self {
		self.with(Operator::Gte, value)
	}

	pub fn lt(self, value: impl Into<Bson>) -> Self {
		self.with(Operator::Lt, value)
	}

	pub fn lte(self, value: impl Into<Bson>) -> Self {
		self.with(Operator::Lte, value)
	}

	/// Field value is one of `values`
	pub fn is_in<I, V>(self, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Bson>,
	{
		self.with(Operator::In, list(values))
	}

	/// Field value is none of `values`
	pub fn not_in<I, V>(self, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Bson>,
	{
		self.with(Operator::NotIn, list(values))
	}

	pub fn is_true(self) -> Self {
		self.with(Operator::IsTrue, true)
	}

	pub fn is_false(self) -> Self {
		self.with(Operator::IsFalse, false)
	}

	pub fn is_null(self) -> Self {
		self.with(Operator::IsNull, Bson::Null)
	}

	pub fn is_not_null(self) -> Self {
		self.with(Operator::IsNotNull, Bson::Null)
	}

	/// Field is an empty string, an empty array or an empty document
	pub fn is_empty(self) -> Self {
		self.with(Operator::IsEmpty, Bson::Null)
	}

	/// Field is neither an empty string, an empty array nor an empty document
	pub fn is_not_empty(self) -> Self {
		self.with(Operator::IsNotEmpty, Bson::Null)
	}

	/// Inclusive range `lower <= field <= upper`
	pub fn between(self, lower: impl Into<Bson>, upper: impl Into<Bson>) -> Self {
		self.with(
			Operator::Between,
			Bson::Array(vec![lower.into(), upper.into()]),
		)
	}
}

/// A condition tree
///
/// The variant is fixed at construction; the translator never re-inspects
/// the shape of a document to decide how to treat it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpression {
	/// Leaves keyed by field, implicitly AND-ed
	Fields(Vec<FieldCondition>),

	/// AND/OR combination of sub-conditions
	Logical {
		connective: Connective,
		operands: Vec<ConditionExpression>,
	},

	/// Hand-written native filter, passed through untouched
	Raw(Document),
}

impl ConditionExpression {
	/// Wrap a pre-built native filter
	pub fn raw(filter: Document) -> Self {
		ConditionExpression::Raw(filter)
	}

	/// Parse the dynamic document form
	///
	/// Keys starting with `$` are connectives (`$and`, `$or`) whose value is
	/// an array of nested conditions. Every other key is a field whose value
	/// is either a document of operator names to operands, or a plain value
	/// meaning equality.
	///
	/// # Examples
	///
	/// ```
	/// use bson::doc;
	/// use docbridge_query::{ConditionExpression, QueryError};
	///
	/// let expr = ConditionExpression::from_document(&doc! {
	///     "$or": [
	///         { "age": { "gte": 18, "lt": 65 } },
	///         { "vip": { "isTrue": true } },
	///     ]
	/// })
	/// .unwrap();
	/// assert!(matches!(expr, ConditionExpression::Logical { .. }));
	///
	/// let err = ConditionExpression::from_document(&doc! { "$nor": [] }).unwrap_err();
	/// assert_eq!(err, QueryError::UnsupportedOperator("$nor".to_string()));
	/// ```
	pub fn from_document(doc: &Document) -> Result<Self> {
		let mut fields = Vec::new();
		let mut nodes = Vec::new();

		for (key, value) in doc {
			if key.starts_with('$') {
				let connective = Connective::from_key(key)?;
				let Bson::Array(items) = value else {
					return Err(QueryError::invalid_operand(
						key.as_str(),
						"expected an array of conditions",
					));
				};

				let operands = items
					.iter()
					.map(|item| match item {
						Bson::Document(inner) => Self::from_document(inner),
						_ => Err(QueryError::invalid_operand(
							key.as_str(),
							"expected an array of conditions",
						)),
					})
					.collect::<Result<Vec<_>>>()?;

				nodes.push(ConditionExpression::Logical {
					connective,
					operands,
				});
			} else {
				fields.push(parse_field(key, value)?);
			}
		}

		if nodes.is_empty() {
			return Ok(ConditionExpression::Fields(fields));
		}
		if fields.is_empty() && nodes.len() == 1 {
			return Ok(nodes.remove(0));
		}

		let mut operands = Vec::with_capacity(nodes.len() + 1);
		if !fields.is_empty() {
			operands.push(ConditionExpression::Fields(fields));
		}
		operands.extend(nodes);

		Ok(ConditionExpression::Logical {
			connective: Connective::And,
			operands,
		})
	}
}

impl From<FieldCondition> for ConditionExpression {
	fn from(field: FieldCondition) -> Self {
		ConditionExpression::Fields(vec![field])
	}
}

impl From<Vec<FieldCondition>> for ConditionExpression {
	fn from(fields: Vec<FieldCondition>) -> Self {
		ConditionExpression::Fields(fields)
	}
}

/// Start a condition on `name`
pub fn field(name: impl Into<String>) -> FieldCondition {
	FieldCondition::new(name)
}

/// Conjunction of `operands`
pub fn and<I>(operands: I) -> ConditionExpression
where
	I: IntoIterator<Item = ConditionExpression>,
{
	ConditionExpression::Logical {
		connective: Connective::And,
		operands: operands.into_iter().collect(),
	}
}

/// Disjunction of `operands`
pub fn or<I>(operands: I) -> ConditionExpression
where
	I: IntoIterator<Item = ConditionExpression>,
{
	ConditionExpression::Logical {
		connective: Connective::Or,
		operands: operands.into_iter().collect(),
	}
}

fn parse_field(name: &str, value: &Bson) -> Result<FieldCondition> {
	let mut condition = FieldCondition::new(name);

	match value {
		Bson::Document(ops) => {
			for (op_name, operand) in ops {
				let operator = op_name.parse::<Operator>()?;
				condition = condition.with(operator, operand.clone());
			}
		}
		other => condition = condition.eq(other.clone()),
	}

	Ok(condition)
}

fn list<I, V>(values: I) -> Bson
where
	I: IntoIterator<Item = V>,
	V: Into<Bson>,
{
	Bson::Array(values.into_iter().map(Into::into).collect())
}
