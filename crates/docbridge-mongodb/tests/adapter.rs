//! Collection adapter tests against a recording driver

mod common;

use std::sync::Arc;

use bson::{Bson, doc};
use common::FakeDriver;
use docbridge_mongodb::{
	AdapterError, BulkUpdateSummary, CollectionAdapter, DeleteSummary, DriverError, IdentityMapping,
	IndexSpec, NAMESPACE_NOT_FOUND, OperationStatus, UpdateSummary,
};
use docbridge_query::condition::{field, or};
use docbridge_query::{
	AggregationParams, ConditionExpression, CountParams, FieldMap, FieldMapping, FindParams,
	Operator, QueryError, RemoveParams,
};
use rstest::*;

#[fixture]
fn driver() -> Arc<FakeDriver> {
	Arc::new(FakeDriver::new())
}

#[fixture]
fn users(driver: Arc<FakeDriver>) -> (Arc<FakeDriver>, CollectionAdapter<FakeDriver>) {
	let adapter = CollectionAdapter::new(Arc::clone(&driver), "users");
	(driver, adapter)
}

// ============================================================================
// Reads
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_find_passes_built_command(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;
	*driver.find_result.lock().unwrap() = vec![doc! { "_id": 1, "age": 30 }];

	let params = FindParams::new()
		.filter(field("age").gte(18))
		.sort(doc! { "age": -1 })
		.limit(10)
		.projection(doc! { "age": 1 });
	let documents = users.find(&params).await.unwrap();

	assert_eq!(documents, vec![doc! { "_id": 1, "age": 30 }]);
	let call = driver.last("find").unwrap();
	assert_eq!(call.collection.as_deref(), Some("users"));
	assert_eq!(
		call.documents,
		vec![
			doc! { "age": { "$gte": 18 } },
			doc! { "age": -1 },
			doc! { "age": 1 },
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_find_without_filter_matches_everything(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;

	users.find(&FindParams::default()).await.unwrap();

	assert_eq!(driver.last("find").unwrap().documents, vec![doc! {}]);
}

#[rstest]
#[tokio::test]
async fn test_count_returns_driver_count(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;
	*driver.count_result.lock().unwrap() = 7;

	let params = CountParams {
		where_: Some(or([field("a").eq(1).into(), field("b").is_null().into()])),
		sort: Some(doc! { "a": 1 }),
	};
	let count = users.count(&params).await.unwrap();

	assert_eq!(count, 7);
	assert_eq!(
		driver.last("count_documents").unwrap().documents,
		vec![doc! { "$or": [{ "a": { "$eq": 1 } }, { "b": { "$eq": Bson::Null } }] }]
	);
}

#[rstest]
#[tokio::test]
async fn test_aggregate_passes_pipeline(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;
	*driver.aggregate_result.lock().unwrap() = vec![doc! { "_id": { "city": "Oslo" }, "count": 2 }];

	let params = AggregationParams {
		group_by: vec!["city".to_string()],
		count: true,
		sort: Some(doc! { "count": -1 }),
		..Default::default()
	};
	let rows = users.aggregate(&params).await.unwrap();

	assert_eq!(rows.len(), 1);
	assert_eq!(
		driver.last("aggregate").unwrap().documents,
		vec![
			doc! { "$group": { "_id": { "city": "$city" }, "count": { "$sum": 1 } } },
			doc! { "$sort": { "count": -1 } },
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_unsupported_filter_never_reaches_driver(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;

	let err = users
		.find(&FindParams::new().filter(field("tags").with(Operator::In, 3)))
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		AdapterError::Query(QueryError::InvalidOperand { .. })
	));
	assert!(driver.calls().is_empty());
}

// ============================================================================
// Updates
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_single_update(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;
	*driver.update_result.lock().unwrap() = UpdateSummary {
		matched_count: 0,
		modified_count: 0,
		upserted_id: Some(Bson::String("new".into())),
	};

	let outcome = users
		.update(
			&[doc! { "name": "b" }],
			&[Some(field("name").eq("a").into())],
			&["UpdateOne"],
		)
		.await
		.unwrap();

	assert_eq!(outcome.status, OperationStatus::Failure);
	assert_eq!(outcome.upserted_ids, vec![Bson::String("new".into())]);
	assert_eq!(
		driver.last("update").unwrap().documents,
		vec![
			doc! { "name": { "$eq": "a" } },
			doc! { "$set": { "name": "b" } },
		]
	);
	assert_eq!(driver.count("bulk_update"), 0);
}

#[rstest]
#[tokio::test]
async fn test_multiple_updates_run_as_bulk(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	*driver.bulk_result.lock().unwrap() = BulkUpdateSummary {
		matched_count: 3,
		modified_count: 3,
		upserted_count: 0,
		upserted_ids: vec![],
	};

	let wheres: Vec<Option<ConditionExpression>> = vec![Some(field("a").eq(1).into()), None];
	let outcome = users
		.update(
			&[doc! { "x": 1 }, doc! { "y": 2 }],
			&wheres,
			&["UpdateOne", "UpdateMany"],
		)
		.await
		.unwrap();

	assert_eq!(outcome.status, OperationStatus::Success);
	assert_eq!(outcome.modified_count, 3);
	assert_eq!(
		driver.last("bulk_update").unwrap().documents,
		vec![
			doc! { "updateOne": { "filter": { "a": { "$eq": 1 } }, "update": { "$set": { "x": 1 } }, "upsert": true } },
			doc! { "updateMany": { "filter": {}, "update": { "$set": { "y": 2 } } } },
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_update_with_mismatched_parameters(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;

	let err = users
		.update(&[doc! { "x": 1 }], &[None, None], &["UpdateOne"])
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		AdapterError::Query(QueryError::ParameterCountMismatch {
			updates: 1,
			wheres: 2,
			methods: 1
		})
	));
	assert!(driver.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_empty_update_skips_driver(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;

	let outcome = users.update::<&str>(&[], &[], &[]).await.unwrap();

	assert_eq!(outcome.status, OperationStatus::Failure);
	assert!(driver.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_bulk_rejects_non_update_operations(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;

	let err = users
		.update_bulk(vec![
			doc! { "updateOne": { "filter": {}, "update": { "$set": { "a": 1 } } } },
			doc! { "deleteOne": { "filter": {} } },
		])
		.await
		.unwrap_err();

	match err {
		AdapterError::BulkUpdateOperations { found } => assert_eq!(found, vec!["deleteOne"]),
		other => panic!("expected a bulk operation error, got {other:?}"),
	}
	assert!(driver.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_bulk_runs_raw_updates(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;
	*driver.bulk_result.lock().unwrap() = BulkUpdateSummary {
		matched_count: 1,
		modified_count: 1,
		upserted_count: 1,
		upserted_ids: vec![Bson::Int32(9)],
	};

	let outcome = users
		.update_bulk(vec![
			doc! { "updateOne": { "filter": { "a": 1 }, "update": { "$set": { "b": 2 } }, "upsert": true } },
		])
		.await
		.unwrap();

	assert_eq!(outcome.status, OperationStatus::Success);
	assert_eq!(outcome.upserted_count, 1);
	assert_eq!(outcome.upserted_ids, vec![Bson::Int32(9)]);
	assert_eq!(driver.count("bulk_update"), 1);
}

#[rstest]
#[tokio::test]
async fn test_failed_bulk_reports_applied_updates(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	let applied = BulkUpdateSummary {
		matched_count: 1,
		modified_count: 1,
		..Default::default()
	};
	driver.fail_next(
		"bulk_update",
		DriverError::new("Document failed validation")
			.with_code(121)
			.with_applied(applied.clone()),
	);

	let err = users
		.update_bulk(vec![
			doc! { "updateOne": { "filter": { "a": 1 }, "update": { "$set": { "b": 2 } } } },
			doc! { "updateOne": { "filter": { "a": 2 }, "update": { "$set": { "b": "x" } } } },
		])
		.await
		.unwrap_err();

	assert!(matches!(err, AdapterError::InvalidData { .. }));
	assert_eq!(err.applied_updates(), Some(&applied));
}

// ============================================================================
// Inserts
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_insert_assigns_ids_in_order(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (_driver, users) = users;

	let inserted = users
		.insert(vec![
			doc! { "name": "a" },
			doc! { "_id": "fixed", "name": "b" },
			doc! { "name": "c" },
		])
		.await
		.unwrap();

	assert_eq!(
		inserted,
		vec![
			doc! { "name": "a", "_id": "gen-1" },
			doc! { "_id": "fixed", "name": "b" },
			doc! { "name": "c", "_id": "gen-2" },
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_insert_nothing(users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>)) {
	let (driver, users) = users;

	assert!(users.insert(vec![]).await.unwrap().is_empty());
	assert!(driver.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_identity_mapping_round_trip(driver: Arc<FakeDriver>) {
	let users = CollectionAdapter::new(Arc::clone(&driver), "users")
		.with_identity(IdentityMapping::new("id"));

	let inserted = users
		.insert(vec![doc! { "id": "u1", "name": "a" }, doc! { "id": Bson::Null, "name": "b" }])
		.await
		.unwrap();

	assert_eq!(
		driver.last("insert_many").unwrap().documents,
		vec![doc! { "name": "a", "_id": "u1" }, doc! { "name": "b" }]
	);
	assert_eq!(
		inserted,
		vec![doc! { "name": "a", "id": "u1" }, doc! { "name": "b", "id": "gen-1" }]
	);

	*driver.find_result.lock().unwrap() = vec![doc! { "_id": "u1", "name": "a" }];
	let found = users
		.find(&FindParams::new().filter(field("id").eq("u1")))
		.await
		.unwrap();

	assert_eq!(found, vec![doc! { "name": "a", "id": "u1" }]);
	assert_eq!(
		driver.last("find").unwrap().documents,
		vec![doc! { "_id": { "$eq": "u1" } }]
	);
}

#[rstest]
#[tokio::test]
async fn test_resolver_takes_precedence_over_identity(driver: Arc<FakeDriver>) {
	let resolver = FieldMap::new().map("id", FieldMapping::rename("key"));
	let users = CollectionAdapter::new(Arc::clone(&driver), "users")
		.with_resolver(Arc::new(resolver))
		.with_identity(IdentityMapping::new("id"));

	users
		.count(&CountParams {
			where_: Some(field("id").eq(3).into()),
			sort: None,
		})
		.await
		.unwrap();

	assert_eq!(
		driver.last("count_documents").unwrap().documents,
		vec![doc! { "key": { "$eq": 3 } }]
	);
}

#[rstest]
#[tokio::test]
async fn test_duplicate_key_is_classified(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	driver.fail_next(
		"insert_many",
		DriverError::new("insert failed").with_write_error(
			11000,
			r#"E11000 duplicate key error collection: app.users index: _id_ dup key: { _id: "X" }"#,
		),
	);

	let err = users
		.insert(vec![doc! { "_id": "X" }])
		.await
		.unwrap_err();

	match &err {
		AdapterError::DuplicateKey { ids, .. } => assert_eq!(ids, &vec!["X".to_string()]),
		other => panic!("expected a duplicate key error, got {other:?}"),
	}
	assert!(!err.is_retryable());
	assert!(err.driver_error().is_some());
}

#[rstest]
#[tokio::test]
async fn test_validation_failure_is_classified(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	driver.fail_next(
		"insert_many",
		DriverError::new("Document failed validation").with_code(121),
	);

	let err = users.insert(vec![doc! { "a": 1 }]).await.unwrap_err();

	assert!(matches!(err, AdapterError::InvalidData { .. }));
}

#[rstest]
#[tokio::test]
async fn test_other_failures_are_driver_errors(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	driver.fail_next("find", DriverError::new("connection refused").with_code(6));

	let err = users.find(&FindParams::default()).await.unwrap_err();

	match err {
		AdapterError::Driver(source) => assert_eq!(source.code, Some(6)),
		other => panic!("expected a driver error, got {other:?}"),
	}
}

// ============================================================================
// Removes
// ============================================================================

#[rstest]
#[case(true, 2, OperationStatus::Success)]
#[case(true, 0, OperationStatus::Failure)]
#[case(false, 0, OperationStatus::Pending)]
#[tokio::test]
async fn test_remove_status(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
	#[case] acknowledged: bool,
	#[case] deleted_count: u64,
	#[case] expected: OperationStatus,
) {
	let (driver, users) = users;
	*driver.delete_result.lock().unwrap() = DeleteSummary {
		acknowledged,
		deleted_count,
	};

	let outcome = users
		.remove(&RemoveParams {
			where_: Some(field("age").lt(18).into()),
		})
		.await
		.unwrap();

	assert_eq!(outcome.status, expected);
	assert_eq!(outcome.deleted_count, deleted_count);
	assert_eq!(
		driver.last("delete_many").unwrap().documents,
		vec![doc! { "age": { "$lt": 18 } }]
	);
}

// ============================================================================
// Indexes
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_ensure_indexes_creates_only_missing(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	let specs = vec![
		IndexSpec::new("_id_", doc! { "_id": 1 }),
		IndexSpec::new("email_1", doc! { "email": 1 }).unique(),
	];

	let created = users.ensure_indexes(&specs).await.unwrap();

	assert_eq!(created, vec!["email_1"]);
	assert_eq!(
		driver.last("create_indexes").unwrap().documents,
		vec![doc! { "email": 1 }]
	);

	// Second run finds everything in place
	let created = users.ensure_indexes(&specs).await.unwrap();

	assert!(created.is_empty());
	assert_eq!(driver.count("create_indexes"), 1);
}

#[rstest]
#[tokio::test]
async fn test_ensure_indexes_on_missing_collection_creates_all(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	driver.fail_next(
		"list_index_names",
		DriverError::new("ns does not exist: app.users")
			.with_code(NAMESPACE_NOT_FOUND)
			.with_code_name("NamespaceNotFound"),
	);
	let specs = vec![
		IndexSpec::new("email_1", doc! { "email": 1 }).unique(),
		IndexSpec::new("age_1", doc! { "age": 1 }),
	];

	let created = users.ensure_indexes(&specs).await.unwrap();

	assert_eq!(created, vec!["email_1", "age_1"]);
	assert_eq!(
		driver.last("create_indexes").unwrap().documents,
		vec![doc! { "email": 1 }, doc! { "age": 1 }]
	);
}

#[rstest]
#[tokio::test]
async fn test_ensure_indexes_propagates_other_listing_failures(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	driver.fail_next(
		"list_index_names",
		DriverError::new("not authorized on app").with_code(13),
	);

	let err = users
		.ensure_indexes(&[IndexSpec::new("email_1", doc! { "email": 1 })])
		.await
		.unwrap_err();

	assert_eq!(err.driver_error().and_then(|e| e.code), Some(13));
	assert_eq!(driver.count("create_indexes"), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_idle_commands_do_not_wait_for_each_other(
	users: (Arc<FakeDriver>, CollectionAdapter<FakeDriver>),
) {
	let (driver, users) = users;
	driver.hold_find();

	let find_params = FindParams::new();
	let both = async {
		tokio::join!(users.find(&find_params), async {
			// Runs while the find above is still pending
			let count = users.count(&CountParams::default()).await;
			driver.release_find();
			count
		})
	};
	let (found, counted) = tokio::time::timeout(std::time::Duration::from_secs(5), both)
		.await
		.expect("count waited for the pending find");

	assert!(found.is_ok());
	assert!(counted.is_ok());
	assert_eq!(driver.operations(), vec!["find", "count_documents"]);
}
