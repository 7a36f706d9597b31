//! MongoDB driver
//!
//! Implements [`DocumentDriver`] on top of the official `mongodb` crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docbridge_mongodb::{CollectionAdapter, MongoDriver};
//! use docbridge_query::FindParams;
//! use docbridge_query::condition::field;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Arc::new(MongoDriver::with_uri("mongodb://localhost:27017", "app").await?);
//! let users = CollectionAdapter::new(driver, "users");
//!
//! let adults = users
//!     .find(&FindParams::new().filter(field("age").gte(18)))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bson::Document;
use docbridge_query::{BulkUpdateOperation, CountOptions, FindOptions, SingleUpdate, UpdateMethod};
use futures::stream::TryStreamExt;
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};

use crate::driver::{
	BulkUpdateSummary, DeleteSummary, DocumentDriver, DriverError, DriverResult,
	InsertManySummary, IndexSpec, UpdateSummary,
};

/// [`DocumentDriver`] backed by a MongoDB client
///
/// The client is a pooled handle; clone the driver or share it through an
/// `Arc` rather than connecting once per collection.
///
/// # Note
///
/// MongoDB transactions require a replica set or sharded cluster.
#[derive(Clone, Debug)]
pub struct MongoDriver {
	client: Client,
	database: Database,
}

impl MongoDriver {
	/// Wrap an existing client
	pub fn new(client: Client, database: &str) -> Self {
		let database = client.database(database);
		Self { client, database }
	}

	/// Create a client from a connection string
	///
	/// Servers are contacted lazily, on the first command.
	///
	/// ```
	/// use docbridge_mongodb::MongoDriver;
	///
	/// # tokio_test::block_on(async {
	/// let driver = MongoDriver::with_uri("mongodb://localhost:27017", "app")
	///     .await
	///     .unwrap();
	/// assert_eq!(driver.database().name(), "app");
	/// # });
	/// ```
	pub async fn with_uri(uri: &str, database: &str) -> DriverResult<Self> {
		let client = Client::with_uri_str(uri).await?;
		tracing::debug!(database, "Created MongoDB client");
		Ok(Self::new(client, database))
	}

	/// Create a client from environment-derived settings
	#[cfg(feature = "conf")]
	pub async fn connect(settings: &docbridge_conf::ConnectionSettings) -> DriverResult<Self> {
		Self::with_uri(&settings.to_url(), &settings.database).await
	}

	pub fn client(&self) -> &Client {
		&self.client
	}

	pub fn database(&self) -> &Database {
		&self.database
	}

	fn collection(&self, name: &str) -> Collection<Document> {
		self.database.collection::<Document>(name)
	}

	async fn update_with(
		&self,
		collection: &str,
		filter: Document,
		update: Document,
		method: UpdateMethod,
		upsert: Option<bool>,
		session: Option<&mut ClientSession>,
	) -> DriverResult<UpdateSummary> {
		let coll = self.collection(collection);

		let mut options = mongodb::options::UpdateOptions::default();
		options.upsert = upsert;

		let mut action = match method {
			UpdateMethod::UpdateOne => coll.update_one(filter, update),
			UpdateMethod::UpdateMany => coll.update_many(filter, update),
		}
		.with_options(options);
		if let Some(session) = session {
			action = action.session(session);
		}
		let result = action.await?;

		Ok(UpdateSummary {
			matched_count: result.matched_count,
			modified_count: result.modified_count,
			upserted_id: result.upserted_id,
		})
	}
}

impl From<mongodb::error::Error> for DriverError {
	fn from(err: mongodb::error::Error) -> Self {
		let mut labels: Vec<String> = err.labels().iter().cloned().collect();
		labels.sort();

		let mut driver_error =
			from_kind(err.kind.as_ref()).unwrap_or_else(|| DriverError::new(err.to_string()));
		driver_error.labels = labels;
		driver_error
	}
}

/// Server-reported failures keep the server's own message
///
/// Write and insert-many errors render their payload with `Debug`, which
/// escapes the quotes inside `dup key: { .. }`.
fn from_kind(kind: &mongodb::error::ErrorKind) -> Option<DriverError> {
	use mongodb::error::{ErrorKind, WriteFailure};

	let driver_error = match kind {
		ErrorKind::Command(command) => DriverError::new(kind.to_string())
			.with_code(command.code)
			.with_code_name(command.code_name.clone()),
		ErrorKind::Write(WriteFailure::WriteError(write)) => {
			let mut driver_error = DriverError::new(write.message.clone())
				.with_code(write.code)
				.with_write_error(write.code, write.message.clone());
			driver_error.code_name = write.code_name.clone();
			driver_error
		}
		ErrorKind::Write(WriteFailure::WriteConcernError(concern)) => {
			DriverError::new(concern.message.clone())
				.with_code(concern.code)
				.with_code_name(concern.code_name.clone())
		}
		ErrorKind::InsertMany(insert) => {
			let write_errors = insert.write_errors.iter().flatten().collect::<Vec<_>>();
			let mut driver_error = DriverError::new(format!(
				"insert_many failed with {} write errors",
				write_errors.len()
			));
			for write in write_errors {
				driver_error = driver_error.with_write_error(write.code, write.message.clone());
			}
			if let Some(concern) = &insert.write_concern_error {
				driver_error = driver_error
					.with_code(concern.code)
					.with_code_name(concern.code_name.clone());
			}
			driver_error
		}
		_ => return None,
	};

	Some(driver_error)
}

#[async_trait]
impl DocumentDriver for MongoDriver {
	type Session = ClientSession;

	async fn start_session(&self) -> DriverResult<ClientSession> {
		Ok(self.client.start_session().await?)
	}

	async fn start_transaction(&self, session: &mut ClientSession) -> DriverResult<()> {
		Ok(session.start_transaction().await?)
	}

	async fn commit_transaction(&self, session: &mut ClientSession) -> DriverResult<()> {
		Ok(session.commit_transaction().await?)
	}

	async fn abort_transaction(&self, session: &mut ClientSession) -> DriverResult<()> {
		Ok(session.abort_transaction().await?)
	}

	async fn end_session(&self, session: ClientSession) {
		// The server session returns to the pool on drop
		drop(session);
	}

	async fn find(
		&self,
		collection: &str,
		filter: Document,
		options: FindOptions,
		session: Option<&mut ClientSession>,
	) -> DriverResult<Vec<Document>> {
		let coll = self.collection(collection);

		let mut mongo_options = mongodb::options::FindOptions::default();
		mongo_options.limit = options.limit;
		mongo_options.skip = options.skip;
		mongo_options.sort = options.sort;
		mongo_options.projection = options.projection;

		let action = coll.find(filter).with_options(mongo_options);
		match session {
			Some(session) => {
				let mut cursor = action.session(&mut *session).await?;
				Ok(cursor.stream(session).try_collect().await?)
			}
			None => Ok(action.await?.try_collect().await?),
		}
	}

	/// Count has no server-side sort; `options.sort` is ignored
	async fn count_documents(
		&self,
		collection: &str,
		filter: Document,
		_options: CountOptions,
		session: Option<&mut ClientSession>,
	) -> DriverResult<u64> {
		let coll = self.collection(collection);

		let mut action = coll.count_documents(filter);
		if let Some(session) = session {
			action = action.session(session);
		}
		Ok(action.await?)
	}

	async fn aggregate(
		&self,
		collection: &str,
		pipeline: Vec<Document>,
		session: Option<&mut ClientSession>,
	) -> DriverResult<Vec<Document>> {
		let coll = self.collection(collection);

		let action = coll.aggregate(pipeline);
		match session {
			Some(session) => {
				let mut cursor = action.session(&mut *session).await?;
				Ok(cursor.stream(session).try_collect().await?)
			}
			None => Ok(action.await?.try_collect().await?),
		}
	}

	async fn update(
		&self,
		collection: &str,
		update: SingleUpdate,
		session: Option<&mut ClientSession>,
	) -> DriverResult<UpdateSummary> {
		self.update_with(
			collection,
			update.filter,
			update.update,
			update.method,
			update.options.upsert,
			session,
		)
		.await
	}

	/// Runs the operations in order, one command each
	///
	/// Atomicity across operations requires an active transaction. Without
	/// one, a failing operation leaves the earlier ones applied; their
	/// results travel in [`DriverError::applied`].
	async fn bulk_update(
		&self,
		collection: &str,
		operations: Vec<BulkUpdateOperation>,
		mut session: Option<&mut ClientSession>,
	) -> DriverResult<BulkUpdateSummary> {
		let mut summary = BulkUpdateSummary::default();

		for operation in operations {
			let method = operation.method();
			let (filter, update, upsert) = match operation {
				BulkUpdateOperation::UpdateOne {
					filter,
					update,
					upsert,
				} => (filter, update, upsert.then_some(true)),
				BulkUpdateOperation::UpdateMany { filter, update } => (filter, update, None),
			};

			let result = self
				.update_with(
					collection,
					filter,
					update,
					method,
					upsert,
					session.as_deref_mut(),
				)
				.await;

			match result {
				Ok(result) => summary.record(result),
				Err(e) => return Err(e.with_applied(summary)),
			}
		}

		Ok(summary)
	}

	async fn insert_many(
		&self,
		collection: &str,
		documents: Vec<Document>,
		session: Option<&mut ClientSession>,
	) -> DriverResult<InsertManySummary> {
		let coll = self.collection(collection);

		let mut action = coll.insert_many(documents);
		if let Some(session) = session {
			action = action.session(session);
		}
		let result = action.await?;

		Ok(InsertManySummary {
			inserted_ids: result.inserted_ids.into_iter().collect(),
		})
	}

	/// The driver reports no acknowledgement flag; results of unacknowledged
	/// writes surface as errors, so a returned result is always acknowledged
	async fn delete_many(
		&self,
		collection: &str,
		filter: Document,
		session: Option<&mut ClientSession>,
	) -> DriverResult<DeleteSummary> {
		let coll = self.collection(collection);

		let mut action = coll.delete_many(filter);
		if let Some(session) = session {
			action = action.session(session);
		}
		let result = action.await?;

		Ok(DeleteSummary {
			acknowledged: true,
			deleted_count: result.deleted_count,
		})
	}

	async fn list_index_names(&self, collection: &str) -> DriverResult<Vec<String>> {
		Ok(self.collection(collection).list_index_names().await?)
	}

	async fn create_indexes(
		&self,
		collection: &str,
		indexes: Vec<IndexSpec>,
	) -> DriverResult<Vec<String>> {
		let models = indexes
			.into_iter()
			.map(|spec| {
				let mut options = mongodb::options::IndexOptions::default();
				options.name = Some(spec.name);
				options.unique = spec.unique.then_some(true);

				IndexModel::builder()
					.keys(spec.keys)
					.options(options)
					.build()
			})
			.collect::<Vec<_>>();

		let result = self.collection(collection).create_indexes(models).await?;
		Ok(result.index_names)
	}
}
