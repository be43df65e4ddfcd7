//! HTTP-level tests for the API router against an in-memory store.
//!
//! Fixtures are seeded through the store; the behavior under test always
//! goes through the router, so these cover the client-facing wire contract
//! (status codes, error prefixes, payload field naming, query aliases).

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use labbook_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use labbook_core::{
  record::{NewRecord, RecordKind},
  schema::NewSchema,
  store::LabStore,
};

use crate::api_router;

async fn fixture() -> (Router, Arc<SqliteStore>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  (api_router(store.clone()), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(v) => builder
      .header("content-type", "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn open_schema(kind: RecordKind, title: &str) -> NewSchema {
  NewSchema {
    kind,
    title: title.into(),
    version: 1,
    document: json!({ "type": "object" }),
  }
}

/// Seed an entity→material→batch chain plus a sample schema that demands a
/// numeric `volume_ml`. Returns `(batch, sample_schema)` ids.
async fn seed_chain(s: &SqliteStore) -> (i64, i64) {
  let ent_schema = s
    .define_schema(open_schema(RecordKind::Entity, "organism"))
    .await
    .unwrap();
  let mat_schema = s
    .define_schema(open_schema(RecordKind::Material, "stock"))
    .await
    .unwrap();
  let bat_schema = s
    .define_schema(open_schema(RecordKind::Batch, "production"))
    .await
    .unwrap();
  let smp_schema = s
    .define_schema(NewSchema {
      kind:     RecordKind::Sample,
      title:    "cultivation".into(),
      version:  1,
      document: json!({
        "type": "object",
        "properties": { "volume_ml": { "type": "number" } },
        "required": ["volume_ml"]
      }),
    })
    .await
    .unwrap();

  let entity = s
    .create_record(NewRecord::new(RecordKind::Entity, ent_schema.id, json!({})).with_name("yeast"))
    .await
    .unwrap();
  let material = s
    .create_record(NewRecord::new(RecordKind::Material, mat_schema.id, json!({})).with_parent(entity.id))
    .await
    .unwrap();
  let batch = s
    .create_record(NewRecord::new(RecordKind::Batch, bat_schema.id, json!({})).with_parent(material.id))
    .await
    .unwrap();

  (batch.id, smp_schema.id)
}

// ─── Validation error bodies ─────────────────────────────────────────────────

#[tokio::test]
async fn violating_sample_payload_gets_the_metadata_prefix() {
  let (app, store) = fixture().await;
  let (batch, smp_schema) = seed_chain(&store).await;

  let (status, body) = send(
    &app,
    "POST",
    "/samples",
    Some(json!({
      "schema_id": smp_schema,
      "parent_id": batch,
      "metadata": { "volume_ml": "fifty" }
    })),
  )
  .await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  let message = body["error"].as_str().unwrap();
  assert!(
    message.starts_with("Metadata validation error: "),
    "unexpected message: {message}"
  );
  assert_eq!(body["path"], "/volume_ml");

  // Nothing was persisted.
  let (_, list) = send(&app, "GET", "/samples", None).await;
  assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn violating_result_payload_gets_the_data_prefix() {
  let (app, store) = fixture().await;
  let (batch, smp_schema) = seed_chain(&store).await;
  let sample = store
    .create_record(
      NewRecord::new(RecordKind::Sample, smp_schema, json!({ "volume_ml": 50 }))
        .with_parent(batch),
    )
    .await
    .unwrap();
  let res_schema = store
    .define_schema(NewSchema {
      kind:     RecordKind::Result,
      title:    "od600".into(),
      version:  1,
      document: json!({
        "type": "object",
        "properties": { "value": { "type": "number" } },
        "required": ["value"]
      }),
    })
    .await
    .unwrap();

  let (status, body) = send(
    &app,
    "POST",
    "/results",
    Some(json!({
      "schema_id": res_schema.id,
      "parent_id": sample.id,
      "data": { "value": "high" }
    })),
  )
  .await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  let message = body["error"].as_str().unwrap();
  assert!(
    message.starts_with("Result data validation error: "),
    "unexpected message: {message}"
  );
  assert_eq!(body["path"], "/value");
}

// ─── Payload field naming ────────────────────────────────────────────────────

#[tokio::test]
async fn payload_field_name_follows_the_kind() {
  let (app, store) = fixture().await;
  let (batch, smp_schema) = seed_chain(&store).await;

  // Samples write and read under "metadata".
  let (status, sample) = send(
    &app,
    "POST",
    "/samples",
    Some(json!({
      "schema_id": smp_schema,
      "parent_id": batch,
      "metadata": { "volume_ml": 50 }
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(sample["metadata"], json!({ "volume_ml": 50 }));
  assert!(sample.get("data").is_none());
  let id = sample["id"].as_i64().unwrap();
  assert_eq!(sample["barcode"], format!("SMP-{id}"));

  // A sample body carrying "data" instead is rejected outright.
  let (status, body) = send(
    &app,
    "POST",
    "/samples",
    Some(json!({
      "schema_id": smp_schema,
      "parent_id": batch,
      "data": { "volume_ml": 50 }
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("metadata"));

  // Results write and read under "data".
  let res_schema = store
    .define_schema(open_schema(RecordKind::Result, "od600"))
    .await
    .unwrap();
  let (status, result) = send(
    &app,
    "POST",
    "/results",
    Some(json!({
      "schema_id": res_schema.id,
      "parent_id": id,
      "data": { "value": 0.93 }
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(result["data"], json!({ "value": 0.93 }));
  assert!(result.get("metadata").is_none());

  let rid = result["id"].as_i64().unwrap();
  let (status, fetched) = send(&app, "GET", &format!("/results/{rid}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["data"], json!({ "value": 0.93 }));
  assert_eq!(fetched["barcode"], format!("RES-{rid}"));
}

// ─── Query parameter aliases ─────────────────────────────────────────────────

#[tokio::test]
async fn schema_type_alias_filters_lists() {
  let (app, store) = fixture().await;
  let (batch, smp_schema) = seed_chain(&store).await;
  let assay_schema = store
    .define_schema(open_schema(RecordKind::Sample, "assay"))
    .await
    .unwrap();

  let cultivated = store
    .create_record(
      NewRecord::new(RecordKind::Sample, smp_schema, json!({ "volume_ml": 50 }))
        .with_parent(batch),
    )
    .await
    .unwrap();
  let assayed = store
    .create_record(NewRecord::new(RecordKind::Sample, assay_schema.id, json!({})).with_parent(batch))
    .await
    .unwrap();

  // The double-underscore relation alias and the plain name both filter.
  for uri in ["/samples?schema__type=assay", "/samples?schema_type=assay"] {
    let (status, list) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap().clone();
    assert_eq!(list.len(), 1, "for {uri}");
    assert_eq!(list[0]["id"].as_i64(), Some(assayed.id));
  }

  let (_, list) = send(&app, "GET", "/samples?schema__type=cultivation", None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["id"].as_i64(), Some(cultivated.id));

  // Version alias composes with the title filter.
  let (_, list) = send(
    &app,
    "GET",
    "/samples?schema__type=assay&schema__version=1",
    None,
  )
  .await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  let (_, list) = send(
    &app,
    "GET",
    "/samples?schema__type=assay&schema__version=2",
    None,
  )
  .await;
  assert_eq!(list.as_array().unwrap().len(), 0);

  let (_, all) = send(&app, "GET", "/samples", None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);
}

// ─── Collections and ids ─────────────────────────────────────────────────────

#[tokio::test]
async fn ids_do_not_leak_across_collections() {
  let (app, store) = fixture().await;
  let (batch, smp_schema) = seed_chain(&store).await;
  let sample = store
    .create_record(
      NewRecord::new(RecordKind::Sample, smp_schema, json!({ "volume_ml": 50 }))
        .with_parent(batch),
    )
    .await
    .unwrap();

  let (status, _) = send(&app, "GET", &format!("/samples/{}", sample.id), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&app, "GET", &format!("/results/{}", sample.id), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "GET", "/widgets", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
