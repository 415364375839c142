mod common;

use common::{Fault, FaultyStore, SHOP_TABLES, counts, demo_store, service_for, snapshot_body};
use serde_json::{Value as JsonValue, json};
use shopvault::backup::{DependencyPlanner, RestoreExecutor, restore};
use shopvault::core::{Column, DataType, Value};
use shopvault::storage::{InMemoryStore, SchemaCatalog, StorageEngine, retail};
use shopvault::{BackupConfig, BackupError, BackupService, RestoreInput};
use std::sync::Arc;

#[tokio::test]
async fn test_round_trip_into_empty_store() {
    let source = demo_store().await;
    source
        .insert_row("users", vec![("username", "admin".into()), ("role", "owner".into())])
        .await
        .unwrap();
    retail::seed_settings(&source).await.unwrap();
    let body = snapshot_body(&source).await;

    let target = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    let summary = service_for(&target)
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap();

    assert_eq!(summary.rows_skipped, 0);
    assert_eq!(summary.rows_restored, 20);
    for table in source.list_tables().await.unwrap() {
        assert_eq!(
            target.rows(&table).await.unwrap(),
            source.rows(&table).await.unwrap(),
            "rows differ for {}",
            table
        );
    }
}

#[tokio::test]
async fn test_restore_replaces_existing_rows() {
    let store = demo_store().await;
    let body = snapshot_body(&store).await;
    store
        .insert_row("categories", vec![("name", "Frozen".into())])
        .await
        .unwrap();

    let summary = service_for(&store)
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap();

    assert_eq!(summary.rows_cleared, 15);
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![3, 5, 2, 4]);
    // the sequence follows the restored keys, not the discarded row
    assert_eq!(store.sequence("categories").await.unwrap(), 3);
    let row = store
        .insert_row("categories", vec![("name", "Frozen".into())])
        .await
        .unwrap();
    assert_eq!(row[0], Value::Integer(4));
}

#[tokio::test]
async fn test_added_column_gets_defaults() {
    let body = snapshot_body(&demo_store().await).await;

    let target = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    target
        .add_column("products", Column::new("barcode", DataType::Text))
        .await
        .unwrap();
    target
        .add_column(
            "products",
            Column::new("reorder_level", DataType::Integer).default_value(5i64),
        )
        .await
        .unwrap();
    target
        .add_column("products", Column::new("is_featured", DataType::Boolean))
        .await
        .unwrap();

    let summary = service_for(&target)
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap();
    assert_eq!(summary.rows_restored, 14);

    let products = target.scan_records("products").await.unwrap();
    assert_eq!(products.len(), 5);
    for product in &products {
        assert_eq!(product["barcode"], JsonValue::Null);
        assert_eq!(product["reorder_level"], json!(5));
        assert_eq!(product["is_featured"], json!(false));
    }
}

#[tokio::test]
async fn test_removed_column_is_dropped() {
    let body = snapshot_body(&demo_store().await).await;

    let target = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    target.drop_column("products", "cost").await.unwrap();

    let summary = service_for(&target)
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap();
    assert_eq!(summary.rows_skipped, 0);
    assert_eq!(target.row_count("products").await.unwrap(), 5);
    let product = &target.scan_records("products").await.unwrap()[0];
    assert!(!product.contains_key("cost"));
    assert_eq!(product["sku"], "DR-001");
}

#[tokio::test]
async fn test_table_missing_from_live_schema_is_skipped_with_warning() {
    let body = snapshot_body(&demo_store().await).await;

    let target = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    target.drop_table("sale_items").await.unwrap();

    let summary = service_for(&target)
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap();
    assert_eq!(summary.tables_restored, 3);
    assert_eq!(summary.rows_restored, 10);
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.category == "SchemaMismatch" && w.table.as_deref() == Some("sale_items")));
}

#[tokio::test]
async fn test_unmanaged_snapshot_table_is_ignored() {
    let store = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    let document = json!({
        "formatVersion": "1.0",
        "tables": {
            "categories": [{"id": 1, "name": "Drinks"}],
            "audit_log": [{"id": 1, "event": "login"}]
        }
    });
    let summary = service_for(&store)
        .restore(RestoreInput::Parsed(document))
        .await
        .unwrap();
    assert_eq!(summary.rows_restored, 1);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].table.as_deref(), Some("audit_log"));
}

#[tokio::test]
async fn test_one_bad_row_in_a_hundred_is_skipped() {
    let store = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    let mut products: Vec<JsonValue> = (1..=100)
        .map(|id| json!({"id": id, "name": format!("Item {}", id), "sku": format!("SKU-{:03}", id)}))
        .collect();
    products[99]["sku"] = json!("SKU-001");
    let document = json!({"formatVersion": "1.0", "tables": {"products": products}});

    let summary = service_for(&store)
        .restore(RestoreInput::Parsed(document))
        .await
        .unwrap();

    let outcome = summary.outcome("products").unwrap();
    assert_eq!(outcome.inserted, 99);
    assert_eq!(outcome.skipped, 1);
    assert!(matches!(outcome.errors[0], BackupError::ConstraintViolation { .. }));
    assert_eq!(summary.rows_skipped, 1);
    assert_eq!(summary.warnings.len(), 1);
    // committed despite the failed row
    assert_eq!(store.row_count("products").await.unwrap(), 99);
}

#[tokio::test]
async fn test_unconvertible_value_skips_only_that_row() {
    let store = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    let document = json!({"tables": {"categories": [
        {"id": 1, "name": "Drinks"},
        {"id": "two", "name": "Snacks"},
        {"id": 3, "name": "Bakery"}
    ]}});
    let summary = service_for(&store)
        .restore(RestoreInput::Parsed(document))
        .await
        .unwrap();
    assert_eq!(summary.rows_restored, 2);
    assert_eq!(summary.rows_skipped, 1);
    // missing formatVersion plus the skipped row
    assert_eq!(summary.warnings.len(), 2);
    assert_eq!(summary.warnings[0].category, "FormatVersion");
}

#[tokio::test]
async fn test_payload_one_byte_over_the_ceiling_is_rejected() {
    let store = demo_store().await;
    let body = snapshot_body(&store).await;
    store.insert_row("categories", vec![("name", "Frozen".into())]).await.unwrap();

    let config = BackupConfig::new().max_restore_bytes(body.len() - 1);
    let service = BackupService::new(Arc::new(store.clone()), config);
    let err = service
        .restore(RestoreInput::Serialized(body.clone()))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BackupError::PayloadTooLarge {
            size: Some(body.len()),
            limit: body.len() - 1
        }
    );
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![4, 5, 2, 4]);

    // exactly at the ceiling is accepted
    let config = BackupConfig::new().max_restore_bytes(body.len());
    let service = BackupService::new(Arc::new(store.clone()), config);
    service.restore(RestoreInput::Serialized(body)).await.unwrap();
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![3, 5, 2, 4]);
}

#[tokio::test]
async fn test_malformed_documents_mutate_nothing() {
    let store = demo_store().await;
    let service = service_for(&store);
    for input in [
        RestoreInput::Serialized("{\"tables\": ".into()),
        RestoreInput::Serialized("{\"formatVersion\": \"1.0\"}".into()),
        RestoreInput::Parsed(json!({"tables": []})),
        RestoreInput::Parsed(json!({"formatVersion": "9.0", "tables": {}})),
    ] {
        assert!(matches!(
            service.restore(input).await,
            Err(BackupError::InvalidFormat(_))
        ));
    }
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![3, 5, 2, 4]);
}

#[tokio::test]
async fn test_rejected_commit_rolls_everything_back() {
    let store = demo_store().await;
    let body = snapshot_body(&store).await;
    store.insert_row("categories", vec![("name", "Frozen".into())]).await.unwrap();

    let faulty = FaultyStore {
        inner: store.clone(),
        fault: Fault::Commit,
    };
    let prepared = restore::prepare(RestoreInput::Serialized(body), usize::MAX).unwrap();
    let planner = DependencyPlanner::retail();
    let err = RestoreExecutor::new(&planner)
        .execute(&faulty, prepared)
        .await
        .unwrap_err();

    assert!(matches!(&err, BackupError::TransactionFailed(detail) if detail.contains("disk full")));
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![4, 5, 2, 4]);
}

#[tokio::test]
async fn test_table_that_cannot_be_cleared_is_skipped() {
    let store = demo_store().await;
    let body = snapshot_body(&store).await;
    store.insert_row("categories", vec![("name", "Frozen".into())]).await.unwrap();

    let clean = service_for(&demo_store().await)
        .restore(RestoreInput::Serialized(body.clone()))
        .await
        .unwrap();

    let faulty = FaultyStore {
        inner: store.clone(),
        fault: Fault::Delete("products"),
    };
    let service = BackupService::new(Arc::new(faulty), BackupConfig::default());
    let summary = service
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap();

    assert_eq!(summary.tables_cleared, clean.tables_cleared - 1);
    let failed_delete = summary
        .warnings
        .iter()
        .find(|w| w.message.contains("locked"))
        .unwrap();
    assert_eq!(failed_delete.table.as_deref(), Some("products"));
    // the surviving products collide with the snapshot's keys
    assert_eq!(summary.outcome("products").unwrap().skipped, 5);
    assert_eq!(summary.rows_skipped, 5);
    // committed: the extra category is gone, everything else restored
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![3, 5, 2, 4]);
    assert!(!store
        .scan_records("categories")
        .await
        .unwrap()
        .iter()
        .any(|row| row["name"] == "Frozen"));
}

#[tokio::test]
async fn test_missing_reference_columns_restore_as_null() {
    let store = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    let document = json!({"formatVersion": "1.0", "tables": {
        "categories": [{"id": 1, "name": "Drinks", "description": true}],
        "products": [{"id": 1, "name": "Tea", "price": 1.0}]
    }});
    let summary = service_for(&store)
        .restore(RestoreInput::Parsed(document))
        .await
        .unwrap();
    assert_eq!(summary.rows_restored, 2);
    assert_eq!(summary.rows_skipped, 0);

    let products = store.scan_records("products").await.unwrap();
    assert_eq!(products[0]["category_id"], JsonValue::Null);
    assert_eq!(products[0]["supplier_id"], JsonValue::Null);
    let categories = store.scan_records("categories").await.unwrap();
    assert_eq!(categories[0]["description"], "true");

    // references remain enforced for later writes
    store
        .insert_row("products", vec![("name", "Cola".into()), ("category_id", 1i64.into())])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_store_lost_mid_restore_is_fatal() {
    let store = demo_store().await;
    let body = snapshot_body(&store).await;

    let faulty = FaultyStore {
        inner: store.clone(),
        fault: Fault::Insert,
    };
    let service = BackupService::new(Arc::new(faulty), BackupConfig::default());
    let err = service
        .restore(RestoreInput::Serialized(body))
        .await
        .unwrap_err();

    assert!(matches!(err, BackupError::ConnectivityFailure(_)));
    // the deletes were rolled back with everything else
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![3, 5, 2, 4]);
}

#[tokio::test]
async fn test_unreachable_store_fails_every_operation() {
    let store = demo_store().await;
    let body = snapshot_body(&store).await;
    let service = service_for(&store);
    store.set_available(false);

    assert!(matches!(
        service.create_snapshot().await,
        Err(BackupError::ConnectivityFailure(_))
    ));
    assert!(matches!(
        service.restore(RestoreInput::Serialized(body)).await,
        Err(BackupError::ConnectivityFailure(_))
    ));
    assert!(matches!(
        service.clear_all().await,
        Err(BackupError::ConnectivityFailure(_))
    ));

    store.set_available(true);
    assert_eq!(counts(&store, &SHOP_TABLES).await, vec![3, 5, 2, 4]);
}
