//! Integration tests against a running Firestore emulator
//!
//! These tests require:
//! 1. A Firestore emulator (`gcloud emulators firestore start`)
//! 2. `FIRESTORE_EMULATOR_HOST` (and optionally `GOOGLE_CLOUD_PROJECT`) set
//!    in the environment or a .env file
//! 3. Run with: cargo test --features integration-tests -- --test-threads=1

#![cfg(feature = "integration-tests")]

use gcp_emulator_admin::firestore::{
    get_value, DocumentStore, EditMode, FieldActions, FieldForm, FieldPath, FieldType, Fields,
    FirestoreStore, FirestoreValue, ImportMode, ImportRecord,
};
use gcp_emulator_admin::{App, ConnectionStatus, EmulatorSettings, Service};
use serde_json::json;

/// Load environment variables from .env file
fn load_env() {
    dotenvy::dotenv().ok();
}

fn app() -> App {
    load_env();
    App::new(EmulatorSettings::from_env()).expect("Failed to create app")
}

/// Generate unique collection name for this test run
fn test_collection(test_name: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    format!("test_{}_{}_{}", test_name, timestamp, rand::random::<u32>())
}

fn fields(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).expect("invalid test fields")
}

#[tokio::test]
async fn test_emulator_is_reachable() {
    let app = app();
    let status = app.connections().check(Service::Firestore).await;
    assert_eq!(status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_create_read_delete_document() {
    let app = app();
    let client = app.firestore();
    let collection = test_collection("crud");

    let created = client
        .create_document(
            app.project_id(),
            &collection,
            &fields(json!({"name": {"stringValue": "Alice"}, "age": {"integerValue": "30"}})),
            Some("alice"),
        )
        .await
        .expect("Failed to create document");
    assert_eq!(created.id(), "alice");

    let fetched = client
        .get_document(&created.name)
        .await
        .expect("Failed to get document");
    assert_eq!(fetched.fields["age"], FirestoreValue::integer(30));

    let listed = client
        .list_documents(app.project_id(), &collection)
        .await
        .expect("Failed to list documents");
    assert_eq!(listed.len(), 1);

    client
        .delete_document(&created.name)
        .await
        .expect("Failed to delete document");
    let err = client.get_document(&created.name).await.unwrap_err();
    assert_eq!(err.api_kind(), Some(gcp_emulator_admin::ApiErrorKind::NotFound));
}

#[tokio::test]
async fn test_create_existing_document_is_already_exists() {
    let app = app();
    let client = app.firestore();
    let collection = test_collection("dup");
    let data = fields(json!({"v": {"booleanValue": true}}));

    client
        .create_document(app.project_id(), &collection, &data, Some("same"))
        .await
        .expect("Failed to create document");
    let err = client
        .create_document(app.project_id(), &collection, &data, Some("same"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_field_actions_round_trip() {
    let app = app();
    let collection = test_collection("actions");
    let store = app.firestore_store(&app.settings().database_id);

    let created = store
        .create_document(
            app.project_id(),
            &collection,
            &fields(json!({"profile": {"mapValue": {"fields": {"tags": {"arrayValue": {}}}}}})),
            None,
        )
        .await
        .expect("Failed to create document");

    let actions = FieldActions::new(store);
    actions.select(Some(created.clone())).await;

    let form = FieldForm::new("", FieldType::String, json!("rust")).under("profile.tags");
    actions
        .save_field(&form, EditMode::Add)
        .await
        .expect("Failed to append tag");

    let form = FieldForm::new("since", FieldType::Timestamp, json!("2026-02-01T12:30")).under("profile");
    actions
        .save_field(&form, EditMode::Add)
        .await
        .expect("Failed to add timestamp");

    let stored = app
        .firestore()
        .get_document(&created.name)
        .await
        .expect("Failed to get document");
    let tag = get_value(&stored.fields, &FieldPath::parse("profile.tags[0]").unwrap()).unwrap();
    assert_eq!(tag, &FirestoreValue::string("rust"));
    assert!(stored.fields["profile"].as_fields().unwrap().contains_key("since"));

    let selected = actions.selected().await.expect("document should stay selected");
    assert_eq!(selected.fields, stored.fields);
}

#[tokio::test]
async fn test_import_skip_existing() {
    let app = app();
    let collection = test_collection("import");
    let store: FirestoreStore = app.firestore_store(&app.settings().database_id);

    let records = vec![
        ImportRecord {
            id: Some("a".to_string()),
            fields: fields(json!({"n": {"integerValue": "1"}})),
        },
        ImportRecord {
            id: None,
            fields: fields(json!({"n": {"integerValue": "2"}})),
        },
    ];

    let first = gcp_emulator_admin::firestore::import_documents(
        &store,
        app.project_id(),
        &collection,
        &records,
        ImportMode::SkipExisting,
    )
    .await
    .expect("Failed to import");
    assert_eq!(first.created, 2);

    let second = gcp_emulator_admin::firestore::import_documents(
        &store,
        app.project_id(),
        &collection,
        &records[..1],
        ImportMode::SkipExisting,
    )
    .await
    .expect("Failed to import");
    assert_eq!((second.created, second.skipped), (0, 1));
    assert_eq!(store.documents().await.len(), 2);
}
