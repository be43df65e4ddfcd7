//! Record types — the uniform representation of every lab object.
//!
//! One struct serves all six kinds. A record's shape is governed by the
//! schema definition it references, not by a per-kind struct; the store's
//! validation gate is the single source of structural truth.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The six kinds of lab record, ordered root-to-leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
  Entity,
  Material,
  Batch,
  Sample,
  Analysis,
  Result,
}

impl RecordKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Entity => "entity",
      Self::Material => "material",
      Self::Batch => "batch",
      Self::Sample => "sample",
      Self::Analysis => "analysis",
      Self::Result => "result",
    }
  }

  /// The kind this kind's parent must have, if it has a parent at all.
  ///
  /// material→entity is the PROTECT edge (an entity cannot be deleted while
  /// materials classify against it); every other edge cascades downward.
  pub fn parent_kind(self) -> Option<RecordKind> {
    match self {
      Self::Entity => None,
      Self::Material => Some(Self::Entity),
      Self::Batch => Some(Self::Material),
      Self::Sample => Some(Self::Batch),
      Self::Analysis | Self::Result => Some(Self::Sample),
    }
  }

  /// Fixed barcode prefix. Entities derive theirs from the payload's
  /// `prefix` field instead, falling back to this value.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Entity => "ENT",
      Self::Material => "MAT",
      Self::Batch => "BAT",
      Self::Sample => "SMP",
      Self::Analysis => "ANA",
      Self::Result => "RES",
    }
  }

  /// The URL collection segment (`/entities`, `/materials`, ...).
  pub fn collection(self) -> &'static str {
    match self {
      Self::Entity => "entities",
      Self::Material => "materials",
      Self::Batch => "batches",
      Self::Sample => "samples",
      Self::Analysis => "analyses",
      Self::Result => "results",
    }
  }

  pub fn from_collection(segment: &str) -> Option<Self> {
    match segment {
      "entities" => Some(Self::Entity),
      "materials" => Some(Self::Material),
      "batches" => Some(Self::Batch),
      "samples" => Some(Self::Sample),
      "analyses" => Some(Self::Analysis),
      "results" => Some(Self::Result),
      _ => None,
    }
  }

  /// Results carry their payload under `data` in API bodies; every other
  /// kind uses `metadata`.
  pub fn payload_field(self) -> &'static str {
    match self {
      Self::Result => "data",
      _ => "metadata",
    }
  }
}

impl fmt::Display for RecordKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Barcode ─────────────────────────────────────────────────────────────────

/// The barcode prefix an entity payload selects: its `prefix` field, or
/// `ENT` when absent. The store's update gate rejects patches that would
/// change it, so the choice made at create holds for the record's lifetime.
pub fn entity_prefix(payload: &serde_json::Value) -> &str {
  payload
    .get("prefix")
    .and_then(|v| v.as_str())
    .unwrap_or(RecordKind::Entity.prefix())
}

/// Derive the display barcode for a record.
///
/// Never persisted. Depends only on the record's kind, surrogate id, and
/// (for entities) the payload prefix pinned at create, so it is stable for
/// the record's lifetime.
pub fn barcode(kind: RecordKind, id: i64, payload: &serde_json::Value) -> String {
  let prefix = match kind {
    RecordKind::Entity => entity_prefix(payload),
    _ => kind.prefix(),
  };
  format!("{prefix}-{id}")
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted lab record of any kind.
///
/// `payload` validated against the referenced schema definition at create
/// and at every update — never on read. `created_at` is immutable;
/// `updated_at` is refreshed on every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
  pub id:         i64,
  pub kind:       RecordKind,
  /// Unique display name for entities; optional free text elsewhere.
  pub name:       Option<String>,
  pub schema_id:  i64,
  pub parent_id:  Option<i64>,
  pub payload:    serde_json::Value,
  /// Derived from kind, id, and the entity payload prefix; not a column.
  pub barcode:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::LabStore::create_record`].
/// `id` and both timestamps are always set by the store.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub kind:      RecordKind,
  pub name:      Option<String>,
  pub schema_id: i64,
  pub parent_id: Option<i64>,
  pub payload:   serde_json::Value,
}

impl NewRecord {
  pub fn new(kind: RecordKind, schema_id: i64, payload: serde_json::Value) -> Self {
    Self {
      kind,
      name: None,
      schema_id,
      parent_id: None,
      payload,
    }
  }

  pub fn with_parent(mut self, parent_id: i64) -> Self {
    self.parent_id = Some(parent_id);
    self
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }
}

/// Input to [`crate::store::LabStore::update_record`].
///
/// The payload is always supplied in full and re-validated against the
/// record's schema (the new one, when `schema_id` is given). `name: None`
/// means keep the current name.
#[derive(Debug, Clone)]
pub struct RecordPatch {
  pub name:      Option<String>,
  pub schema_id: Option<i64>,
  pub payload:   serde_json::Value,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn parent_topology_is_a_chain_to_sample() {
    assert_eq!(RecordKind::Entity.parent_kind(), None);
    assert_eq!(RecordKind::Material.parent_kind(), Some(RecordKind::Entity));
    assert_eq!(RecordKind::Batch.parent_kind(), Some(RecordKind::Material));
    assert_eq!(RecordKind::Sample.parent_kind(), Some(RecordKind::Batch));
    assert_eq!(RecordKind::Analysis.parent_kind(), Some(RecordKind::Sample));
    assert_eq!(RecordKind::Result.parent_kind(), Some(RecordKind::Sample));
  }

  #[test]
  fn collection_names_round_trip() {
    for kind in [
      RecordKind::Entity,
      RecordKind::Material,
      RecordKind::Batch,
      RecordKind::Sample,
      RecordKind::Analysis,
      RecordKind::Result,
    ] {
      assert_eq!(RecordKind::from_collection(kind.collection()), Some(kind));
    }
    assert_eq!(RecordKind::from_collection("widgets"), None);
  }

  #[test]
  fn barcode_uses_kind_prefix() {
    assert_eq!(barcode(RecordKind::Sample, 42, &json!({})), "SMP-42");
    assert_eq!(barcode(RecordKind::Result, 7, &json!({})), "RES-7");
  }

  #[test]
  fn entity_barcode_prefers_payload_prefix() {
    let payload = json!({ "prefix": "YEAST", "strain": "S288C" });
    assert_eq!(barcode(RecordKind::Entity, 3, &payload), "YEAST-3");
    assert_eq!(barcode(RecordKind::Entity, 3, &json!({})), "ENT-3");
  }
}
