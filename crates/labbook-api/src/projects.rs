//! Handlers for `/projects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/projects` | All projects |
//! | `POST`   | `/projects` | Body: `{"name":"...","description":"..."}` |
//! | `GET`    | `/projects/:id` | 404 if not found |
//! | `DELETE` | `/projects/:id` | Memberships go with it; records survive |
//! | `GET`    | `/projects/:id/records` | Members of any kind, creation order |
//! | `PUT`    | `/projects/:id/records/:record_id` | Idempotent add |
//! | `DELETE` | `/projects/:id/records/:record_id` | Idempotent remove |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use labbook_core::{
  project::{NewProject, Project},
  store::LabStore,
};
use serde_json::Value;

use crate::{error::ApiError, records::records_json};

/// `GET /projects`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let projects = store.list_projects().await?;
  Ok(Json(projects))
}

/// `POST /projects`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let project = store.create_project(body).await?;
  Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /projects/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Project>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let project = store
    .get_project(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))?;
  Ok(Json(project))
}

/// `DELETE /projects/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  store.delete_project(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /projects/:id/records`
pub async fn records<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  let members = store.list_project_records(id).await?;
  Ok(Json(records_json(members)))
}

/// `PUT /projects/:id/records/:record_id`
pub async fn add_record<S>(
  State(store): State<Arc<S>>,
  Path((id, record_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  store.add_to_project(id, record_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /projects/:id/records/:record_id`
pub async fn remove_record<S>(
  State(store): State<Arc<S>>,
  Path((id, record_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError>
where
  S: LabStore<Error = labbook_core::Error>,
{
  store.remove_from_project(id, record_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
