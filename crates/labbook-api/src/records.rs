//! Generic handlers for the six record collections.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{collection}` | `?schema_type=&schema_version=&parent_id=&project_id=&limit=&offset=` |
//! | `POST`   | `/{collection}` | Body: [`RecordBody`]; 201 + stored record |
//! | `GET`    | `/{collection}/:id` | 404 if absent or of another kind |
//! | `PUT`    | `/{collection}/:id` | Re-runs the validation gate |
//! | `DELETE` | `/{collection}/:id` | CASCADE children; 409 on PROTECT |
//! | `GET`    | `/samples/:id/results` | Projection over the result collection |
//!
//! `{collection}` is one of `entities`, `materials`, `batches`, `samples`,
//! `analyses`, `results`. Bodies carry the payload under `metadata`
//! (`data` for results); responses mirror that naming and add the derived
//! `barcode`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use labbook_core::{
  record::{NewRecord, Record, RecordKind, RecordPatch},
  store::{LabStore, RecordQuery},
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

// ─── Path & body plumbing ─────────────────────────────────────────────────────

fn kind_from_collection(segment: &str) -> Result<RecordKind, ApiError> {
  RecordKind::from_collection(segment)
    .ok_or_else(|| ApiError::NotFound(format!("no such collection: {segment:?}")))
}

/// JSON body accepted by `POST /{collection}` and `PUT /{collection}/:id`.
///
/// The payload arrives under `metadata` or `data`; [`take_payload`] picks
/// the field the kind expects and rejects the body otherwise.
#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub name:      Option<String>,
  pub schema_id: Option<i64>,
  pub parent_id: Option<i64>,
  pub metadata:  Option<Value>,
  pub data:      Option<Value>,
}

fn take_payload(kind: RecordKind, body: &mut RecordBody) -> Result<Value, ApiError> {
  let field = kind.payload_field();
  let slot = match kind {
    RecordKind::Result => &mut body.data,
    _ => &mut body.metadata,
  };
  slot
    .take()
    .ok_or_else(|| ApiError::BadRequest(format!("missing {field:?} field")))
}

/// Serialise a record with the kind-appropriate payload field name.
fn record_json(record: Record) -> Value {
  let mut map = serde_json::Map::new();
  map.insert("id".into(), record.id.into());
  map.insert("kind".into(), record.kind.as_str().into());
  map.insert(
    "name".into(),
    record.name.map_or(Value::Null, Value::String),
  );
  map.insert("schema_id".into(), record.schema_id.into());
  map.insert(
    "parent_id".into(),
    record.parent_id.map_or(Value::Null, Value::from),
  );
  map.insert(record.kind.payload_field().into(), record.payload);
  map.insert("barcode".into(), record.barcode.into());
  map.insert("created_at".into(), record.created_at.to_rfc3339().into());
  map.insert("updated_at".into(), record.updated_at.to_rfc3339().into());
  Value::Object(map)
}

pub(crate) fn records_json(records: Vec<Record>) -> Value {
  Value::Array(records.into_iter().map(record_json).collect())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// Query parameters for list endpoints. The double-underscore aliases match
/// the original client convention for relation filters.
#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(alias = "schema__type")]
  pub schema_type:    Option<String>,
  #[serde(alias = "schema__version")]
  pub schema_version: Option<u32>,
  pub parent_id:      Option<i64>,
  pub project_id:     Option<i64>,
  pub limit:          Option<u32>,
  pub offset:         Option<u32>,
}

impl From<ListParams> for RecordQuery {
  fn from(p: ListParams) -> Self {
    RecordQuery {
      schema_title:   p.schema_type,
      schema_version: p.schema_version,
      parent_id:      p.parent_id,
      project_id:     p.project_id,
      limit:          p.limit,
      offset:         p.offset,
    }
  }
}

/// `GET /{collection}[?schema_type=...&schema_version=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(collection): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let kind = kind_from_collection(&collection)?;
  let query = RecordQuery::from(params);
  let records = store.list_records(kind, &query).await?;
  Ok(Json(records_json(records)))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /{collection}` — 201 + the stored record.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Path(collection): Path<String>,
  Json(mut body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let kind = kind_from_collection(&collection)?;
  let schema_id = body
    .schema_id
    .ok_or_else(|| ApiError::BadRequest("missing \"schema_id\" field".into()))?;
  let payload = take_payload(kind, &mut body)?;

  let input = NewRecord {
    kind,
    name: body.name,
    schema_id,
    parent_id: body.parent_id,
    payload,
  };
  let record = store
    .create_record(input)
    .await
    .map_err(|e| ApiError::from_write(kind, e))?;
  Ok((StatusCode::CREATED, Json(record_json(record))))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /{collection}/:id` — 404 when the id belongs to another collection.
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((collection, id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let kind = kind_from_collection(&collection)?;
  let record = fetch_of_kind(&*store, kind, id).await?;
  Ok(Json(record_json(record)))
}

async fn fetch_of_kind<S>(store: &S, kind: RecordKind, id: i64) -> Result<Record, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let record = store
    .get_record(id)
    .await?
    .filter(|r| r.kind == kind)
    .ok_or_else(|| ApiError::NotFound(format!("{kind} {id} not found")))?;
  Ok(record)
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /{collection}/:id` — full payload replacement behind the same gate
/// as create.
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path((collection, id)): Path<(String, i64)>,
  Json(mut body): Json<RecordBody>,
) -> Result<Json<Value>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let kind = kind_from_collection(&collection)?;
  // Resolve through the collection first so a sample cannot be updated via
  // /results/:id.
  fetch_of_kind(&*store, kind, id).await?;

  let payload = take_payload(kind, &mut body)?;
  let patch = RecordPatch {
    name: body.name,
    schema_id: body.schema_id,
    payload,
  };
  let record = store
    .update_record(id, patch)
    .await
    .map_err(|e| ApiError::from_write(kind, e))?;
  Ok(Json(record_json(record)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /{collection}/:id` — cascades belongs-to children; 409 when a
/// PROTECT dependent blocks it.
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path((collection, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let kind = kind_from_collection(&collection)?;
  fetch_of_kind(&*store, kind, id).await?;
  store.delete_record(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Sample results ───────────────────────────────────────────────────────────

/// `GET /samples/:id/results` — all results for one sample, in creation
/// order. A pure projection; nothing is validated on read.
pub async fn sample_results<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  fetch_of_kind(&*store, RecordKind::Sample, id).await?;

  let query = RecordQuery {
    parent_id: Some(id),
    ..Default::default()
  };
  let results = store.list_records(RecordKind::Result, &query).await?;
  Ok(Json(records_json(results)))
}
