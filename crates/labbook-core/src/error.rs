//! Error types for `labbook-core`.
//!
//! Every failure is detected synchronously within a single store call and
//! returned to the immediate caller; a failed write leaves all tables
//! unchanged.

use thiserror::Error;

use crate::record::RecordKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("schema definition not found: {0}")]
  SchemaNotFound(i64),

  #[error("record not found: {0}")]
  RecordNotFound(i64),

  #[error("project not found: {0}")]
  ProjectNotFound(i64),

  #[error("schema {kind} {title:?} v{version} already exists")]
  DuplicateVersion {
    kind:    RecordKind,
    title:   String,
    version: u32,
  },

  #[error("name already taken: {0:?}")]
  DuplicateName(String),

  #[error("{0} records require a name")]
  NameRequired(RecordKind),

  #[error("schema version must be at least 1, got {0}")]
  InvalidVersion(u32),

  #[error("not a valid JSON-Schema document: {0}")]
  InvalidSchemaDocument(String),

  /// Payload failed structural validation. `path` is the JSON-pointer
  /// location of the first violation inside the payload.
  #[error("{message} (at {path:?})")]
  SchemaViolation { message: String, path: String },

  #[error("schema validates {schema} records, not {record}")]
  SchemaKindMismatch {
    schema: RecordKind,
    record: RecordKind,
  },

  #[error("{0} records require a parent")]
  ParentRequired(RecordKind),

  #[error("{0} records cannot have a parent")]
  ParentForbidden(RecordKind),

  #[error("parent must be a {expected}, got a {found}")]
  ParentKindMismatch {
    expected: RecordKind,
    found:    RecordKind,
  },

  /// An update tried to change the barcode prefix an entity payload was
  /// created with. Barcodes are stable for a record's lifetime.
  #[error("barcode prefix of record {0} cannot change")]
  PrefixImmutable(i64),

  /// Deleting the schema is blocked while records reference it.
  #[error("schema {0} is still referenced by at least one record")]
  SchemaInUse(i64),

  /// Deleting the record is blocked by a PROTECT-typed dependent.
  #[error("record {0} still has dependents on a protected relation")]
  RecordProtected(i64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Backend storage fault (SQL, I/O, connection). Not a client error.
  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
