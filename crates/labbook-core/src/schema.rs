//! Versioned schema definitions — the write-time validation contract.
//!
//! Definitions are immutable once stored. Schema evolution means defining a
//! new version under the same `(kind, title)`, never mutating an existing
//! row, so every persisted record's validation result stays reproducible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RecordKind;

/// An immutable, versioned JSON-Schema document.
///
/// `(kind, title, version)` is unique, enforced atomically by the storage
/// layer. Deletion is blocked while any record references the definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
  pub id:         i64,
  /// The record kind this definition validates.
  pub kind:       RecordKind,
  /// Logical schema name within the kind, e.g. `"cultivation"`.
  pub title:      String,
  pub version:    u32,
  /// The JSON-Schema document, stored verbatim.
  pub document:   serde_json::Value,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::LabStore::define_schema`].
/// `id` and `created_at` are store-assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSchema {
  pub kind:     RecordKind,
  pub title:    String,
  pub version:  u32,
  pub document: serde_json::Value,
}
