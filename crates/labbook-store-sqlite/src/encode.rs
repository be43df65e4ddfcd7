//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, kinds as their lowercase
//! names, and JSON columns (schema documents, payloads) as compact JSON
//! text. A row that fails to decode is a storage fault, not a client error.

use chrono::{DateTime, Utc};
use labbook_core::{
  Error, Result,
  project::Project,
  record::{self, Record, RecordKind},
  schema::SchemaDefinition,
};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("bad timestamp {s:?}: {e}")))
}

// ─── RecordKind ──────────────────────────────────────────────────────────────

pub fn encode_kind(k: RecordKind) -> &'static str { k.as_str() }

pub fn decode_kind(s: &str) -> Result<RecordKind> {
  match s {
    "entity" => Ok(RecordKind::Entity),
    "material" => Ok(RecordKind::Material),
    "batch" => Ok(RecordKind::Batch),
    "sample" => Ok(RecordKind::Sample),
    "analysis" => Ok(RecordKind::Analysis),
    "result" => Ok(RecordKind::Result),
    other => Err(Error::Storage(format!("unknown record kind: {other:?}"))),
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json(value: &serde_json::Value) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json(s: &str) -> Result<serde_json::Value> {
  serde_json::from_str(s)
    .map_err(|e| Error::Storage(format!("corrupt JSON column: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `schemas` row.
pub struct RawSchema {
  pub schema_id:  i64,
  pub kind:       String,
  pub title:      String,
  pub version:    i64,
  pub document:   String,
  pub created_at: String,
}

impl RawSchema {
  pub fn into_definition(self) -> Result<SchemaDefinition> {
    Ok(SchemaDefinition {
      id:         self.schema_id,
      kind:       decode_kind(&self.kind)?,
      title:      self.title,
      version:    self.version as u32,
      document:   decode_json(&self.document)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `records` row.
pub struct RawRecord {
  pub record_id:  i64,
  pub kind:       String,
  pub name:       Option<String>,
  pub schema_id:  i64,
  pub parent_id:  Option<i64>,
  pub payload:    String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawRecord {
  pub fn into_record(self) -> Result<Record> {
    let kind = decode_kind(&self.kind)?;
    let payload = decode_json(&self.payload)?;
    // The barcode is derived here, never read from a column.
    let barcode = record::barcode(kind, self.record_id, &payload);

    Ok(Record {
      id: self.record_id,
      kind,
      name: self.name,
      schema_id: self.schema_id,
      parent_id: self.parent_id,
      payload,
      barcode,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id:  i64,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawProject {
  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:          self.project_id,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
