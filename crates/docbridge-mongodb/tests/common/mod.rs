//! Recording in-process driver for adapter and session tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::{Bson, Document};
use docbridge_mongodb::{
	BulkUpdateSummary, DeleteSummary, DocumentDriver, DriverError, DriverResult,
	InsertManySummary, IndexSpec, UpdateSummary,
};
use docbridge_query::{BulkUpdateOperation, CountOptions, FindOptions, SingleUpdate};
use tokio::sync::Notify;

/// Session handle handed out by [`FakeDriver`]
#[derive(Debug)]
pub struct FakeSession {
	pub id: usize,
}

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
	pub operation: &'static str,
	pub collection: Option<String>,
	/// Id of the session the call ran in
	pub session: Option<usize>,
	pub documents: Vec<Document>,
}

/// Driver double recording every call
///
/// Canned results are returned for collection commands; failures queued
/// with [`fail_next`](Self::fail_next) are returned once, in order.
pub struct FakeDriver {
	calls: Mutex<Vec<Call>>,
	failures: Mutex<HashMap<&'static str, VecDeque<DriverError>>>,
	next_session: AtomicUsize,
	next_id: AtomicUsize,
	hold_find: AtomicBool,
	find_release: Notify,
	pub find_result: Mutex<Vec<Document>>,
	pub count_result: Mutex<u64>,
	pub aggregate_result: Mutex<Vec<Document>>,
	pub update_result: Mutex<UpdateSummary>,
	pub bulk_result: Mutex<BulkUpdateSummary>,
	pub delete_result: Mutex<DeleteSummary>,
	pub index_names: Mutex<Vec<String>>,
}

impl FakeDriver {
	pub fn new() -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			failures: Mutex::new(HashMap::new()),
			next_session: AtomicUsize::new(1),
			next_id: AtomicUsize::new(1),
			hold_find: AtomicBool::new(false),
			find_release: Notify::new(),
			find_result: Mutex::new(Vec::new()),
			count_result: Mutex::new(0),
			aggregate_result: Mutex::new(Vec::new()),
			update_result: Mutex::new(UpdateSummary {
				matched_count: 1,
				modified_count: 1,
				upserted_id: None,
			}),
			bulk_result: Mutex::new(BulkUpdateSummary::default()),
			delete_result: Mutex::new(DeleteSummary {
				acknowledged: true,
				deleted_count: 1,
			}),
			index_names: Mutex::new(vec!["_id_".to_string()]),
		}
	}

	/// Make the next call of `operation` fail with `error`
	pub fn fail_next(&self, operation: &'static str, error: DriverError) {
		self.failures
			.lock()
			.unwrap()
			.entry(operation)
			.or_default()
			.push_back(error);
	}

	/// Keep `find` calls pending until [`release_find`](Self::release_find)
	pub fn hold_find(&self) {
		self.hold_find.store(true, Ordering::SeqCst);
	}

	pub fn release_find(&self) {
		self.hold_find.store(false, Ordering::SeqCst);
		self.find_release.notify_one();
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	pub fn operations(&self) -> Vec<&'static str> {
		self.calls().into_iter().map(|call| call.operation).collect()
	}

	pub fn count(&self, operation: &str) -> usize {
		self.calls()
			.iter()
			.filter(|call| call.operation == operation)
			.count()
	}

	pub fn last(&self, operation: &str) -> Option<Call> {
		self.calls()
			.into_iter()
			.rev()
			.find(|call| call.operation == operation)
	}

	fn record(
		&self,
		operation: &'static str,
		collection: Option<&str>,
		session: Option<&FakeSession>,
		documents: Vec<Document>,
	) -> DriverResult<()> {
		self.calls.lock().unwrap().push(Call {
			operation,
			collection: collection.map(str::to_string),
			session: session.map(|s| s.id),
			documents,
		});

		match self
			.failures
			.lock()
			.unwrap()
			.get_mut(operation)
			.and_then(VecDeque::pop_front)
		{
			Some(error) => Err(error),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl DocumentDriver for FakeDriver {
	type Session = FakeSession;

	async fn start_session(&self) -> DriverResult<FakeSession> {
		self.record("start_session", None, None, vec![])?;
		Ok(FakeSession {
			id: self.next_session.fetch_add(1, Ordering::SeqCst),
		})
	}

	async fn start_transaction(&self, session: &mut FakeSession) -> DriverResult<()> {
		self.record("start_transaction", None, Some(session), vec![])
	}

	async fn commit_transaction(&self, session: &mut FakeSession) -> DriverResult<()> {
		self.record("commit_transaction", None, Some(session), vec![])
	}

	async fn abort_transaction(&self, session: &mut FakeSession) -> DriverResult<()> {
		self.record("abort_transaction", None, Some(session), vec![])
	}

	async fn end_session(&self, session: FakeSession) {
		let _ = self.record("end_session", None, Some(&session), vec![]);
	}

	async fn find(
		&self,
		collection: &str,
		filter: Document,
		options: FindOptions,
		session: Option<&mut FakeSession>,
	) -> DriverResult<Vec<Document>> {
		let mut documents = vec![filter];
		documents.extend(options.sort);
		documents.extend(options.projection);
		self.record("find", Some(collection), session.as_deref(), documents)?;
		if self.hold_find.load(Ordering::SeqCst) {
			self.find_release.notified().await;
		}
		Ok(self.find_result.lock().unwrap().clone())
	}

	async fn count_documents(
		&self,
		collection: &str,
		filter: Document,
		_options: CountOptions,
		session: Option<&mut FakeSession>,
	) -> DriverResult<u64> {
		self.record("count_documents", Some(collection), session.as_deref(), vec![filter])?;
		Ok(*self.count_result.lock().unwrap())
	}

	async fn aggregate(
		&self,
		collection: &str,
		pipeline: Vec<Document>,
		session: Option<&mut FakeSession>,
	) -> DriverResult<Vec<Document>> {
		self.record("aggregate", Some(collection), session.as_deref(), pipeline)?;
		Ok(self.aggregate_result.lock().unwrap().clone())
	}

	async fn update(
		&self,
		collection: &str,
		update: SingleUpdate,
		session: Option<&mut FakeSession>,
	) -> DriverResult<UpdateSummary> {
		self.record(
			"update",
			Some(collection),
			session.as_deref(),
			vec![update.filter, update.update],
		)?;
		Ok(self.update_result.lock().unwrap().clone())
	}

	async fn bulk_update(
		&self,
		collection: &str,
		operations: Vec<BulkUpdateOperation>,
		session: Option<&mut FakeSession>,
	) -> DriverResult<BulkUpdateSummary> {
		let documents = operations.iter().map(BulkUpdateOperation::to_document).collect();
		self.record("bulk_update", Some(collection), session.as_deref(), documents)?;
		Ok(self.bulk_result.lock().unwrap().clone())
	}

	async fn insert_many(
		&self,
		collection: &str,
		documents: Vec<Document>,
		session: Option<&mut FakeSession>,
	) -> DriverResult<InsertManySummary> {
		self.record("insert_many", Some(collection), session.as_deref(), documents.clone())?;

		let inserted_ids = documents
			.iter()
			.enumerate()
			.map(|(index, doc)| {
				let id = doc.get("_id").cloned().unwrap_or_else(|| {
					Bson::String(format!("gen-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
				});
				(index, id)
			})
			.collect();

		Ok(InsertManySummary { inserted_ids })
	}

	async fn delete_many(
		&self,
		collection: &str,
		filter: Document,
		session: Option<&mut FakeSession>,
	) -> DriverResult<DeleteSummary> {
		self.record("delete_many", Some(collection), session.as_deref(), vec![filter])?;
		Ok(*self.delete_result.lock().unwrap())
	}

	async fn list_index_names(&self, collection: &str) -> DriverResult<Vec<String>> {
		self.record("list_index_names", Some(collection), None, vec![])?;
		Ok(self.index_names.lock().unwrap().clone())
	}

	async fn create_indexes(
		&self,
		collection: &str,
		indexes: Vec<IndexSpec>,
	) -> DriverResult<Vec<String>> {
		let keys = indexes.iter().map(|spec| spec.keys.clone()).collect();
		self.record("create_indexes", Some(collection), None, keys)?;

		let names: Vec<String> = indexes.into_iter().map(|spec| spec.name).collect();
		self.index_names.lock().unwrap().extend(names.clone());
		Ok(names)
	}
}
