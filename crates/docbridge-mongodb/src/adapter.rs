//! Collection adapter
//!
//! [`CollectionAdapter`] is the entry point for domain code. It builds
//! native commands with a [`QueryBuilder`], runs them through a
//! [`DocumentDriver`] inside the active transaction when there is one, and
//! shapes the results into provider-neutral outcomes. Driver failures leave
//! the adapter only as classified [`AdapterError`]s.

use std::future::Future;
use std::sync::Arc;

use bson::Document;
use docbridge_query::{
	AggregationParams, BulkUpdateOperation, ConditionExpression, ConditionTranslator, CountParams,
	FieldResolver, FindParams, ID_FIELD, QueryBuilder, RemoveParams, UpdateCommand,
};
use tokio::sync::MutexGuard;

use crate::driver::{DocumentDriver, IndexSpec};
use crate::error::{AdapterError, Result};
use crate::identity::IdentityMapping;
use crate::outcome::{RemoveOutcome, UpdateOutcome};
use crate::session::TransactionalSession;

/// Adapter bound to one collection
///
/// Adapters share the driver through an `Arc` and never close it. Each
/// adapter owns its own [`TransactionalSession`]; commands issued while a
/// transaction is active run inside it.
pub struct CollectionAdapter<D: DocumentDriver> {
	driver: Arc<D>,
	collection: String,
	builder: QueryBuilder,
	has_resolver: bool,
	identity: Option<IdentityMapping>,
	session: TransactionalSession<D>,
}

impl<D: DocumentDriver> CollectionAdapter<D> {
	pub fn new(driver: Arc<D>, collection: impl Into<String>) -> Self {
		Self {
			session: TransactionalSession::new(Arc::clone(&driver)),
			driver,
			collection: collection.into(),
			builder: QueryBuilder::default(),
			has_resolver: false,
			identity: None,
		}
	}

	/// Map logical field names and values in every filter through `resolver`
	pub fn with_resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
		self.builder = QueryBuilder::new(ConditionTranslator::with_resolver(resolver));
		self.has_resolver = true;
		self
	}

	/// Store the logical identity field under `_id`
	///
	/// Documents are renamed on insert and read. Filters on the field are
	/// mapped too, unless a resolver was installed with
	/// [`with_resolver`](Self::with_resolver).
	pub fn with_identity(mut self, identity: IdentityMapping) -> Self {
		if !self.has_resolver {
			self.builder = QueryBuilder::new(ConditionTranslator::with_resolver(Arc::new(
				identity.field_map(),
			)));
		}
		self.identity = Some(identity);
		self
	}

	pub fn collection(&self) -> &str {
		&self.collection
	}

	pub fn builder(&self) -> &QueryBuilder {
		&self.builder
	}

	pub fn session(&self) -> &TransactionalSession<D> {
		&self.session
	}

	pub async fn find(&self, params: &FindParams) -> Result<Vec<Document>> {
		let command = self.builder.build_find(params)?;
		tracing::debug!(collection = %self.collection, filter = %command.filter, "find");

		let mut active = self.session.active().await;
		let documents = self
			.driver
			.find(
				&self.collection,
				command.filter,
				command.options,
				session_of(&mut active),
			)
			.await?;

		Ok(documents.into_iter().map(|doc| self.read(doc)).collect())
	}

	pub async fn count(&self, params: &CountParams) -> Result<u64> {
		let command = self.builder.build_count(params)?;
		tracing::debug!(collection = %self.collection, filter = %command.filter, "count");

		let mut active = self.session.active().await;
		Ok(self
			.driver
			.count_documents(
				&self.collection,
				command.filter,
				command.options,
				session_of(&mut active),
			)
			.await?)
	}

	/// Run an aggregation; grouped output is returned as produced
	pub async fn aggregate(&self, params: &AggregationParams) -> Result<Vec<Document>> {
		let pipeline = self.builder.build_aggregation(params)?;
		tracing::debug!(collection = %self.collection, stages = pipeline.len(), "aggregate");

		let mut active = self.session.active().await;
		Ok(self
			.driver
			.aggregate(&self.collection, pipeline, session_of(&mut active))
			.await?)
	}

	/// Apply `$set` updates from parallel `updates`, `wheres` and `methods`
	///
	/// See [`QueryBuilder::build_update`] for how the triples become a
	/// single update or a bulk.
	pub async fn update<M: AsRef<str>>(
		&self,
		updates: &[Document],
		wheres: &[Option<ConditionExpression>],
		methods: &[M],
	) -> Result<UpdateOutcome> {
		match self.builder.build_update(updates, wheres, methods)? {
			UpdateCommand::Single(update) => {
				tracing::debug!(
					collection = %self.collection,
					method = %update.method,
					filter = %update.filter,
					"update"
				);

				let mut active = self.session.active().await;
				let summary = self
					.driver
					.update(&self.collection, update, session_of(&mut active))
					.await?;
				Ok(summary.into())
			}
			UpdateCommand::Bulk(operations) => self.run_bulk(operations).await,
		}
	}

	/// Run raw bulk-write operation documents
	///
	/// Only `updateOne` and `updateMany` operations are accepted; anything
	/// else is rejected before the driver is called.
	///
	/// Outside a transaction a failing operation does not undo the ones
	/// before it; [`AdapterError::applied_updates`] reports what was applied.
	pub async fn update_bulk(&self, operations: Vec<Document>) -> Result<UpdateOutcome> {
		let mut parsed = Vec::with_capacity(operations.len());
		let mut rejected = Vec::new();

		for raw in &operations {
			match BulkUpdateOperation::from_document(raw) {
				Some(operation) => parsed.push(operation),
				None => rejected.push(
					raw.keys()
						.next()
						.cloned()
						.unwrap_or_else(|| "<empty>".to_string()),
				),
			}
		}

		if !rejected.is_empty() {
			return Err(AdapterError::BulkUpdateOperations { found: rejected });
		}

		self.run_bulk(parsed).await
	}

	/// Insert `documents`, returning them with their assigned `_id`s in input order
	pub async fn insert(&self, documents: Vec<Document>) -> Result<Vec<Document>> {
		if documents.is_empty() {
			return Ok(Vec::new());
		}

		let native: Vec<Document> = documents.into_iter().map(|doc| self.write(doc)).collect();
		tracing::debug!(collection = %self.collection, count = native.len(), "insert");

		let summary = {
			let mut active = self.session.active().await;
			self.driver
				.insert_many(&self.collection, native.clone(), session_of(&mut active))
				.await?
		};

		Ok(native
			.into_iter()
			.enumerate()
			.map(|(index, mut doc)| {
				if let Some(id) = summary.inserted_ids.get(&index) {
					doc.insert(ID_FIELD, id.clone());
				}
				self.read(doc)
			})
			.collect())
	}

	pub async fn remove(&self, params: &RemoveParams) -> Result<RemoveOutcome> {
		let command = self.builder.build_remove(params)?;
		tracing::debug!(collection = %self.collection, filter = %command.filter, "remove");

		let mut active = self.session.active().await;
		let summary = self
			.driver
			.delete_many(&self.collection, command.filter, session_of(&mut active))
			.await?;
		Ok(summary.into())
	}

	/// Create the indexes of `specs` that do not exist yet
	///
	/// A collection that does not exist yet has no indexes. Returns the
	/// names of the indexes created.
	pub async fn ensure_indexes(&self, specs: &[IndexSpec]) -> Result<Vec<String>> {
		let existing = match self.driver.list_index_names(&self.collection).await {
			Ok(names) => names,
			// The collection is created along with its first index
			Err(e) if e.is_namespace_not_found() => Vec::new(),
			Err(e) => return Err(e.into()),
		};
		let missing: Vec<IndexSpec> = specs
			.iter()
			.filter(|spec| !existing.contains(&spec.name))
			.cloned()
			.collect();

		if missing.is_empty() {
			tracing::debug!(collection = %self.collection, "Indexes up to date");
			return Ok(Vec::new());
		}

		let created = self
			.driver
			.create_indexes(&self.collection, missing)
			.await?;
		tracing::info!(collection = %self.collection, indexes = ?created, "Created indexes");
		Ok(created)
	}

	pub async fn start_transaction(&self) -> Result<()> {
		self.session.start_transaction().await
	}

	pub async fn commit_transaction(&self) -> Result<()> {
		self.session.commit_transaction().await
	}

	pub async fn rollback_transaction(&self) -> Result<()> {
		self.session.rollback_transaction().await
	}

	pub async fn is_active(&self) -> bool {
		self.session.is_active().await
	}

	/// See [`TransactionalSession::release`]
	pub async fn release_session(&self) -> bool {
		self.session.release().await
	}

	/// See [`TransactionalSession::with_transaction`]
	pub async fn with_transaction<F, Fut, T>(&self, f: F) -> Result<T>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.session.with_transaction(f).await
	}

	async fn run_bulk(&self, operations: Vec<BulkUpdateOperation>) -> Result<UpdateOutcome> {
		if operations.is_empty() {
			return Ok(UpdateOutcome::empty());
		}
		tracing::debug!(
			collection = %self.collection,
			operations = operations.len(),
			"bulk update"
		);

		let mut active = self.session.active().await;
		let summary = self
			.driver
			.bulk_update(&self.collection, operations, session_of(&mut active))
			.await?;
		Ok(summary.into())
	}

	fn write(&self, doc: Document) -> Document {
		match &self.identity {
			Some(identity) => identity.to_native(doc),
			None => doc,
		}
	}

	fn read(&self, doc: Document) -> Document {
		match &self.identity {
			Some(identity) => identity.from_native(doc),
			None => doc,
		}
	}
}

fn session_of<'a, S>(active: &'a mut Option<MutexGuard<'_, Option<S>>>) -> Option<&'a mut S> {
	active.as_deref_mut().and_then(Option::as_mut)
}
