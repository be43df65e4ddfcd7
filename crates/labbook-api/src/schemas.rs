//! Handlers for `/schemas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/schemas` | Optional `?kind=entity\|material\|...` |
//! | `POST`   | `/schemas` | Body: [`labbook_core::schema::NewSchema`] |
//! | `GET`    | `/schemas/:id` | 404 if not found |
//! | `DELETE` | `/schemas/:id` | 409 while any record references it |
//!
//! There is no update route: schema evolution means posting a new version.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use labbook_core::{
  record::RecordKind,
  schema::{NewSchema, SchemaDefinition},
  store::LabStore,
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<RecordKind>,
}

/// `GET /schemas[?kind=<kind>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SchemaDefinition>>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let schemas = store.list_schemas(params.kind).await?;
  Ok(Json(schemas))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /schemas` — body: `{"kind":"sample","title":"cultivation","version":1,"document":{...}}`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewSchema>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let definition = store.define_schema(body).await?;
  Ok((StatusCode::CREATED, Json(definition)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /schemas/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<SchemaDefinition>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let definition = store
    .get_schema(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("schema {id} not found")))?;
  Ok(Json(definition))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /schemas/:id` — blocked (409) while any record references it.
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  store.delete_schema(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
