//! Condition expression to MongoDB filter translation
//!
//! The translator walks a [`ConditionExpression`] and emits the equivalent
//! native filter document. It holds no mutable state and can be shared
//! between tasks behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};

use crate::condition::{ConditionExpression, FieldCondition, Predicate};
use crate::error::{QueryError, Result};
use crate::mapping::{FieldMapping, FieldResolver};
use crate::operator::{Connective, Operator, OperatorTranslator};

/// Lowers condition expressions into MongoDB filter documents
///
/// # Examples
///
/// ```
/// use bson::doc;
/// use docbridge_query::ConditionTranslator;
/// use docbridge_query::condition::{field, or};
///
/// let translator = ConditionTranslator::new();
/// let filter = translator
///     .translate(&or([field("age").gte(18).into(), field("vip").is_true().into()]))
///     .unwrap();
///
/// assert_eq!(
///     filter,
///     doc! { "$or": [ { "age": { "$gte": 18 } }, { "vip": { "$eq": true } } ] }
/// );
/// ```
#[derive(Clone, Default)]
pub struct ConditionTranslator {
	resolver: Option<Arc<dyn FieldResolver>>,
}

impl ConditionTranslator {
	/// Translator that passes field names and values through verbatim
	pub fn new() -> Self {
		Self { resolver: None }
	}

	/// Translator that maps fields through `resolver`
	pub fn with_resolver(resolver: Arc<dyn FieldResolver>) -> Self {
		Self {
			resolver: Some(resolver),
		}
	}

	/// Translate a condition tree into a native filter
	pub fn translate(&self, expr: &ConditionExpression) -> Result<Document> {
		match expr {
			ConditionExpression::Raw(filter) => Ok(filter.clone()),
			ConditionExpression::Fields(fields) => self.translate_fields(fields),
			ConditionExpression::Logical {
				connective,
				operands,
			} => self.translate_logical(*connective, operands),
		}
	}

	/// Parse and translate the dynamic document form
	///
	/// See [`ConditionExpression::from_document`] for the accepted shape.
	pub fn translate_document(&self, doc: &Document) -> Result<Document> {
		let expr = ConditionExpression::from_document(doc)?;
		self.translate(&expr)
	}

	fn translate_logical(
		&self,
		connective: Connective,
		operands: &[ConditionExpression],
	) -> Result<Document> {
		if operands.is_empty() {
			return Ok(Document::new());
		}

		let translated = operands
			.iter()
			.map(|operand| self.translate(operand).map(Bson::Document))
			.collect::<Result<Vec<_>>>()?;

		Ok(single(
			OperatorTranslator::connective(connective),
			Bson::Array(translated),
		))
	}

	fn translate_fields(&self, fields: &[FieldCondition]) -> Result<Document> {
		let mut clauses = Vec::new();
		for condition in fields {
			clauses.extend(self.translate_field(condition)?);
		}
		Ok(merge_clauses(clauses))
	}

	/// Clauses for one field
	///
	/// Single-token predicates share one operator document. A token that
	/// repeats, and every composite predicate, gets its own clause.
	fn translate_field(&self, condition: &FieldCondition) -> Result<Vec<Document>> {
		let mapping = self
			.resolver
			.as_ref()
			.and_then(|resolver| resolver.lookup_field(&condition.field));
		let key = mapping
			.as_ref()
			.map(|m| m.native_key().to_string())
			.unwrap_or_else(|| condition.field.clone());

		let mut ops = Document::new();
		let mut extra = Vec::new();

		for Predicate { operator, value } in &condition.predicates {
			match operator {
				Operator::IsEmpty => extra.push(empty_clause(&key, "$eq", Connective::Or)),
				Operator::IsNotEmpty => extra.push(empty_clause(&key, "$ne", Connective::And)),
				Operator::Between => {
					let (lower, upper) = between_bounds(value)?;
					push_op(&key, &mut ops, &mut extra, "$gte", map_value(&mapping, lower));
					push_op(&key, &mut ops, &mut extra, "$lte", map_value(&mapping, upper));
				}
				Operator::IsTrue => push_op(&key, &mut ops, &mut extra, "$eq", Bson::Boolean(true)),
				Operator::IsFalse => {
					push_op(&key, &mut ops, &mut extra, "$eq", Bson::Boolean(false))
				}
				Operator::IsNull => push_op(&key, &mut ops, &mut extra, "$eq", Bson::Null),
				Operator::IsNotNull => push_op(&key, &mut ops, &mut extra, "$ne", Bson::Null),
				Operator::In | Operator::NotIn => {
					let Bson::Array(items) = value else {
						return Err(QueryError::invalid_operand(
							operator.name(),
							"expected an array",
						));
					};
					let mapped = items
						.iter()
						.map(|item| map_value(&mapping, item.clone()))
						.collect();
					push_op(&key, &mut ops, &mut extra, native(*operator)?, Bson::Array(mapped));
				}
				_ => push_op(
					&key,
					&mut ops,
					&mut extra,
					native(*operator)?,
					map_value(&mapping, value.clone()),
				),
			}
		}

		let mut clauses = Vec::with_capacity(extra.len() + 1);
		if !ops.is_empty() {
			clauses.push(single(&key, Bson::Document(ops)));
		}
		clauses.extend(extra);
		Ok(clauses)
	}
}

impl fmt::Debug for ConditionTranslator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConditionTranslator")
			.field("resolver", &self.resolver.is_some())
			.finish()
	}
}

fn native(operator: Operator) -> Result<&'static str> {
	OperatorTranslator::native(operator)
		.ok_or_else(|| QueryError::UnsupportedOperator(operator.name().to_string()))
}

fn map_value(mapping: &Option<FieldMapping>, value: Bson) -> Bson {
	match mapping {
		Some(mapping) => mapping.apply(value),
		None => value,
	}
}

fn push_op(key: &str, ops: &mut Document, extra: &mut Vec<Document>, token: &str, value: Bson) {
	if ops.contains_key(token) {
		extra.push(single(key, Bson::Document(single(token, value))));
	} else {
		ops.insert(token, value);
	}
}

fn between_bounds(value: &Bson) -> Result<(Bson, Bson)> {
	match value {
		Bson::Array(bounds) if bounds.len() == 2 => Ok((bounds[0].clone(), bounds[1].clone())),
		_ => Err(QueryError::invalid_operand(
			Operator::Between.name(),
			"expected a two-element array",
		)),
	}
}

/// `{<connective>: [{key: {token: ""}}, {key: {token: []}}, {key: {token: {}}}]}`
fn empty_clause(key: &str, token: &str, connective: Connective) -> Document {
	let empties = [
		Bson::String(String::new()),
		Bson::Array(Vec::new()),
		Bson::Document(Document::new()),
	];
	let tests = empties
		.into_iter()
		.map(|empty| Bson::Document(single(key, Bson::Document(single(token, empty)))))
		.collect();

	single(OperatorTranslator::connective(connective), Bson::Array(tests))
}

/// Fold clauses into one document, or an explicit `$and` when keys collide
fn merge_clauses(mut clauses: Vec<Document>) -> Document {
	if clauses.len() == 1 {
		return clauses.remove(0);
	}

	let total: usize = clauses.iter().map(Document::len).sum();
	let mut merged = Document::new();
	for clause in &clauses {
		for (key, value) in clause {
			merged.insert(key.clone(), value.clone());
		}
	}

	if merged.len() == total {
		merged
	} else {
		let all = clauses.into_iter().map(Bson::Document).collect();
		single("$and", Bson::Array(all))
	}
}

fn single(key: &str, value: Bson) -> Document {
	let mut doc = Document::new();
	doc.insert(key, value);
	doc
}
