//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use labbook_core::{Error as StoreError, record::RecordKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// A payload failed schema validation. `message` already carries the
  /// fixed client-facing prefix; `path` is the JSON-pointer location of the
  /// violation inside the payload.
  #[error("{message}")]
  Validation { message: String, path: String },

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Map a store error raised by a write on `kind`.
  ///
  /// Validation failures get the kind-appropriate client prefix; everything
  /// else maps like a read error.
  pub fn from_write(kind: RecordKind, err: StoreError) -> Self {
    match err {
      StoreError::SchemaViolation { message, path } => {
        let prefix = match kind {
          RecordKind::Result => "Result data validation error",
          _ => "Metadata validation error",
        };
        ApiError::Validation {
          message: format!("{prefix}: {message}"),
          path,
        }
      }
      other => other.into(),
    }
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    use StoreError as E;
    match e {
      E::SchemaNotFound(_) | E::RecordNotFound(_) | E::ProjectNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      E::DuplicateVersion { .. }
      | E::DuplicateName(_)
      | E::SchemaInUse(_)
      | E::RecordProtected(_)
      | E::PrefixImmutable(_) => ApiError::Conflict(e.to_string()),
      E::SchemaViolation { message, path } => ApiError::Validation {
        message: format!("Metadata validation error: {message}"),
        path,
      },
      E::InvalidVersion(_)
      | E::InvalidSchemaDocument(_)
      | E::SchemaKindMismatch { .. }
      | E::ParentRequired(_)
      | E::ParentForbidden(_)
      | E::ParentKindMismatch { .. }
      | E::NameRequired(_) => ApiError::BadRequest(e.to_string()),
      E::Serialization(_) | E::Storage(_) => ApiError::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Validation { message, path } => (
        StatusCode::BAD_REQUEST,
        json!({ "error": message, "path": path }),
      ),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": m })),
    };
    (status, Json(body)).into_response()
  }
}
