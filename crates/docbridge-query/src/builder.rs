//! Command assembly from domain-level request objects
//!
//! [`QueryBuilder`] turns find, count, remove, update and aggregation
//! requests into the filter, option and pipeline documents MongoDB expects.
//! Every embedded condition goes through the builder's
//! [`ConditionTranslator`].

use std::fmt;
use std::str::FromStr;

use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::condition::ConditionExpression;
use crate::error::{QueryError, Result};
use crate::translator::ConditionTranslator;

/// Find request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParams {
	pub where_: Option<ConditionExpression>,
	pub sort: Option<Document>,
	pub limit: Option<i64>,
	pub offset: Option<u64>,
	pub projection: Option<Document>,
}

impl FindParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn filter(mut self, condition: impl Into<ConditionExpression>) -> Self {
		self.where_ = Some(condition.into());
		self
	}

	pub fn sort(mut self, sort: Document) -> Self {
		self.sort = Some(sort);
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn offset(mut self, offset: u64) -> Self {
		self.offset = Some(offset);
		self
	}

	pub fn projection(mut self, projection: Document) -> Self {
		self.projection = Some(projection);
		self
	}
}

/// Count request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountParams {
	pub where_: Option<ConditionExpression>,
	pub sort: Option<Document>,
}

/// Remove request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveParams {
	pub where_: Option<ConditionExpression>,
}

/// Aggregation request
///
/// Field lists name the source fields; each requested aggregate becomes a
/// `<kind>_<field>` entry of the `$group` stage. Output names cannot hold
/// dots, so a path such as `address.city` is written as `address_city`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationParams {
	pub group_by: Vec<String>,
	pub filter_by: Option<ConditionExpression>,
	pub sort: Option<Document>,
	pub sum: Vec<String>,
	pub average: Vec<String>,
	pub min: Vec<String>,
	pub max: Vec<String>,
	pub count: bool,
	pub where_: Option<ConditionExpression>,
}

impl AggregationParams {
	fn groups(&self) -> bool {
		!self.group_by.is_empty()
			|| !self.sum.is_empty()
			|| !self.average.is_empty()
			|| !self.min.is_empty()
			|| !self.max.is_empty()
			|| self.count
	}
}

/// Options of a find command; unset options stay `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
	pub limit: Option<i64>,
	pub skip: Option<u64>,
	pub sort: Option<Document>,
	pub projection: Option<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindCommand {
	pub filter: Document,
	pub options: FindOptions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountOptions {
	pub sort: Option<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountCommand {
	pub filter: Document,
	pub options: CountOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveCommand {
	pub filter: Document,
	pub options: Document,
}

/// Update flavour of a single update triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateMethod {
	UpdateOne,
	UpdateMany,
}

impl UpdateMethod {
	/// Key used for this method in a bulk operation document
	pub fn bulk_key(&self) -> &'static str {
		match self {
			UpdateMethod::UpdateOne => "updateOne",
			UpdateMethod::UpdateMany => "updateMany",
		}
	}
}

impl fmt::Display for UpdateMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UpdateMethod::UpdateOne => f.write_str("UpdateOne"),
			UpdateMethod::UpdateMany => f.write_str("UpdateMany"),
		}
	}
}

impl FromStr for UpdateMethod {
	type Err = ();

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"UpdateOne" | "updateOne" => Ok(UpdateMethod::UpdateOne),
			"UpdateMany" | "updateMany" => Ok(UpdateMethod::UpdateMany),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
	pub upsert: Option<bool>,
}

/// One update sent as a plain `updateOne`/`updateMany` call
#[derive(Debug, Clone, PartialEq)]
pub struct SingleUpdate {
	pub filter: Document,
	pub update: Document,
	pub options: UpdateOptions,
	pub method: UpdateMethod,
}

/// Operation of a bulk update
#[derive(Debug, Clone, PartialEq)]
pub enum BulkUpdateOperation {
	UpdateOne {
		filter: Document,
		update: Document,
		upsert: bool,
	},
	UpdateMany {
		filter: Document,
		update: Document,
	},
}

impl BulkUpdateOperation {
	pub fn method(&self) -> UpdateMethod {
		match self {
			BulkUpdateOperation::UpdateOne { .. } => UpdateMethod::UpdateOne,
			BulkUpdateOperation::UpdateMany { .. } => UpdateMethod::UpdateMany,
		}
	}

	pub fn filter(&self) -> &Document {
		match self {
			BulkUpdateOperation::UpdateOne { filter, .. }
			| BulkUpdateOperation::UpdateMany { filter, .. } => filter,
		}
	}

	pub fn update(&self) -> &Document {
		match self {
			BulkUpdateOperation::UpdateOne { update, .. }
			| BulkUpdateOperation::UpdateMany { update, .. } => update,
		}
	}

	/// Render as a bulk-write operation document
	///
	/// `updateMany` entries never carry an `upsert` key.
	pub fn to_document(&self) -> Document {
		match self {
			BulkUpdateOperation::UpdateOne {
				filter,
				update,
				upsert,
			} => doc! {
				"updateOne": { "filter": filter.clone(), "update": update.clone(), "upsert": *upsert }
			},
			BulkUpdateOperation::UpdateMany { filter, update } => doc! {
				"updateMany": { "filter": filter.clone(), "update": update.clone() }
			},
		}
	}

	/// Parse a raw bulk-write operation document
	///
	/// Returns `None` unless the document has exactly one key, `updateOne`
	/// or `updateMany`, holding `filter` and `update` documents.
	pub fn from_document(doc: &Document) -> Option<Self> {
		if doc.len() != 1 {
			return None;
		}
		let (key, body) = doc.iter().next()?;
		let Bson::Document(body) = body else {
			return None;
		};
		let filter = body.get_document("filter").ok()?.clone();
		let update = body.get_document("update").ok()?.clone();

		match key.parse::<UpdateMethod>().ok()? {
			UpdateMethod::UpdateOne => Some(BulkUpdateOperation::UpdateOne {
				filter,
				update,
				upsert: body.get_bool("upsert").unwrap_or(false),
			}),
			UpdateMethod::UpdateMany => Some(BulkUpdateOperation::UpdateMany { filter, update }),
		}
	}
}

/// Output of [`QueryBuilder::build_update`]
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCommand {
	Single(SingleUpdate),
	Bulk(Vec<BulkUpdateOperation>),
}

/// Assembles native command parameters
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
	translator: ConditionTranslator,
}

impl QueryBuilder {
	pub fn new(translator: ConditionTranslator) -> Self {
		Self { translator }
	}

	pub fn translator(&self) -> &ConditionTranslator {
		&self.translator
	}

	pub fn build_find(&self, params: &FindParams) -> Result<FindCommand> {
		Ok(FindCommand {
			filter: self.filter(params.where_.as_ref())?,
			options: FindOptions {
				limit: params.limit,
				skip: params.offset,
				sort: params.sort.clone(),
				projection: params.projection.clone(),
			},
		})
	}

	/// Count carries a sort only; limit and skip do not apply
	pub fn build_count(&self, params: &CountParams) -> Result<CountCommand> {
		Ok(CountCommand {
			filter: self.filter(params.where_.as_ref())?,
			options: CountOptions {
				sort: params.sort.clone(),
			},
		})
	}

	pub fn build_remove(&self, params: &RemoveParams) -> Result<RemoveCommand> {
		Ok(RemoveCommand {
			filter: self.filter(params.where_.as_ref())?,
			options: Document::new(),
		})
	}

	/// Build an update from parallel `updates`, `wheres` and `methods`
	///
	/// One triple yields a [`UpdateCommand::Single`]; any other count yields
	/// a [`UpdateCommand::Bulk`] in input order. `UpdateOne` updates upsert.
	///
	/// # Examples
	///
	/// ```
	/// use bson::doc;
	/// use docbridge_query::{QueryBuilder, QueryError};
	///
	/// let builder = QueryBuilder::default();
	/// let err = builder
	///     .build_update(&[doc! { "a": 1 }], &[], &["UpdateOne"])
	///     .unwrap_err();
	///
	/// assert_eq!(
	///     err,
	///     QueryError::ParameterCountMismatch { updates: 1, wheres: 0, methods: 1 }
	/// );
	/// ```
	pub fn build_update<M: AsRef<str>>(
		&self,
		updates: &[Document],
		wheres: &[Option<ConditionExpression>],
		methods: &[M],
	) -> Result<UpdateCommand> {
		if updates.len() != wheres.len() || wheres.len() != methods.len() {
			return Err(QueryError::ParameterCountMismatch {
				updates: updates.len(),
				wheres: wheres.len(),
				methods: methods.len(),
			});
		}

		let methods = methods
			.iter()
			.enumerate()
			.map(|(index, method)| {
				method
					.as_ref()
					.parse::<UpdateMethod>()
					.map_err(|_| QueryError::UnknownUpdateMethod {
						index,
						method: method.as_ref().to_string(),
					})
			})
			.collect::<Result<Vec<_>>>()?;

		let mut operations = Vec::with_capacity(updates.len());
		for ((fields, condition), method) in updates.iter().zip(wheres).zip(methods) {
			let filter = self.filter(condition.as_ref())?;
			let update = doc! { "$set": fields.clone() };
			operations.push((filter, update, method));
		}

		if operations.len() == 1 {
			let (filter, update, method) = operations.remove(0);
			let upsert = (method == UpdateMethod::UpdateOne).then_some(true);
			return Ok(UpdateCommand::Single(SingleUpdate {
				filter,
				update,
				options: UpdateOptions { upsert },
				method,
			}));
		}

		Ok(UpdateCommand::Bulk(
			operations
				.into_iter()
				.map(|(filter, update, method)| match method {
					UpdateMethod::UpdateOne => BulkUpdateOperation::UpdateOne {
						filter,
						update,
						upsert: true,
					},
					UpdateMethod::UpdateMany => BulkUpdateOperation::UpdateMany { filter, update },
				})
				.collect(),
		))
	}

	/// Build an aggregation pipeline
	///
	/// Stages appear in the fixed order `$match` (from `filter_by`),
	/// `$group`, `$sort`, `$match` (from `where_`). A stage whose parameters
	/// are absent is left out.
	///
	/// The trailing `$match` filters the grouped output after sorting.
	pub fn build_aggregation(&self, params: &AggregationParams) -> Result<Vec<Document>> {
		let mut pipeline = Vec::new();

		if let Some(filter_by) = &params.filter_by {
			pipeline.push(doc! { "$match": self.translator.translate(filter_by)? });
		}

		if params.groups() {
			pipeline.push(doc! { "$group": group_stage(params) });
		}

		if let Some(sort) = &params.sort {
			pipeline.push(doc! { "$sort": sort.clone() });
		}

		if let Some(where_) = &params.where_ {
			pipeline.push(doc! { "$match": self.translator.translate(where_)? });
		}

		tracing::trace!(stages = pipeline.len(), "Built aggregation pipeline");
		Ok(pipeline)
	}

	fn filter(&self, condition: Option<&ConditionExpression>) -> Result<Document> {
		match condition {
			Some(condition) => self.translator.translate(condition),
			None => Ok(Document::new()),
		}
	}
}

fn group_stage(params: &AggregationParams) -> Document {
	let id = if params.group_by.is_empty() {
		Bson::Null
	} else {
		let mut keys = Document::new();
		for field in &params.group_by {
			keys.insert(output_name(field), format!("${}", field));
		}
		Bson::Document(keys)
	};

	let mut group = doc! { "_id": id };
	let accumulators = [
		("sum", "$sum", &params.sum),
		("avg", "$avg", &params.average),
		("min", "$min", &params.min),
		("max", "$max", &params.max),
	];
	for (prefix, accumulator, fields) in accumulators {
		for field in fields {
			let mut expr = Document::new();
			expr.insert(accumulator, format!("${}", field));
			group.insert(format!("{}_{}", prefix, output_name(field)), expr);
		}
	}
	if params.count {
		group.insert("count", doc! { "$sum": 1 });
	}

	group
}

/// `$group` output fields may not contain `.`
fn output_name(field: &str) -> String {
	field.replace('.', "_")
}
