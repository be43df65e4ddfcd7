//! The `LabStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `labbook-store-sqlite`). The API layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Every write is one atomic unit: resolve the schema definition, validate
//! the payload, persist — with no suspension point another writer could
//! interleave with. The storage layer's constraints (unique schema versions,
//! PROTECT/CASCADE references) are the final authority, not the caller's
//! earlier reads.

use std::future::Future;

use crate::{
  project::{NewProject, Project},
  record::{NewRecord, Record, RecordKind, RecordPatch},
  schema::{NewSchema, SchemaDefinition},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Filter parameters for [`LabStore::list_records`].
///
/// All filters are equality filters composed before pagination. Results are
/// in stable creation order.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  /// Restrict to records whose schema definition has this title.
  pub schema_title:   Option<String>,
  /// Restrict to records whose schema definition has this version.
  pub schema_version: Option<u32>,
  /// Restrict to direct children of this record.
  pub parent_id:      Option<i64>,
  /// Restrict to members of this project.
  pub project_id:     Option<i64>,
  pub limit:          Option<u32>,
  pub offset:         Option<u32>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a labbook storage backend.
///
/// Schema definitions are immutable: there is no update operation anywhere
/// on this trait, by design. Records are mutable but every mutation re-runs
/// the validation gate.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LabStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schema definitions ────────────────────────────────────────────────

  /// Persist a new schema definition.
  ///
  /// Fails with `DuplicateVersion` if `(kind, title, version)` is taken,
  /// `InvalidVersion` for version 0, and `InvalidSchemaDocument` if the
  /// document is not itself well-formed JSON-Schema.
  fn define_schema(
    &self,
    input: NewSchema,
  ) -> impl Future<Output = Result<SchemaDefinition, Self::Error>> + Send + '_;

  /// Retrieve a definition by id. Returns `None` if not found.
  fn get_schema(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<SchemaDefinition>, Self::Error>> + Send + '_;

  /// List definitions, optionally restricted to one record kind.
  fn list_schemas(
    &self,
    kind: Option<RecordKind>,
  ) -> impl Future<Output = Result<Vec<SchemaDefinition>, Self::Error>> + Send + '_;

  /// Delete an unreferenced definition.
  ///
  /// Fails with `SchemaInUse` while any record still points at it.
  fn delete_schema(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Create a record behind the validation gate.
  ///
  /// Resolves the schema definition, checks that its kind matches the
  /// record's, checks the parent reference against the kind topology, then
  /// validates the payload — all inside one transaction. On any failure
  /// nothing is persisted.
  fn create_record(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found. No validation
  /// occurs on read.
  fn get_record(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// List records of one kind matching `query`.
  fn list_records<'a>(
    &'a self,
    kind: RecordKind,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Update a record's payload (and optionally name / schema reference),
  /// re-running the same gate as [`LabStore::create_record`]. Refreshes
  /// `updated_at`.
  fn update_record(
    &self,
    id: i64,
    patch: RecordPatch,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Delete a record.
  ///
  /// CASCADE-typed children (batches under a material, samples under a
  /// batch, analyses and results under a sample) are removed transitively.
  /// Fails with `RecordProtected` when a PROTECT-typed dependent exists
  /// (an entity that materials still classify against), removing nothing.
  fn delete_record(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Projects ──────────────────────────────────────────────────────────

  /// Fails with `DuplicateName` if the project name is taken.
  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_projects(
    &self,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  /// Delete a project. Memberships disappear with it; records survive.
  fn delete_project(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Add a record to a project. Adding twice is a no-op.
  fn add_to_project(
    &self,
    project_id: i64,
    record_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a record from a project. Removing an absent membership is a
  /// no-op.
  fn remove_from_project(
    &self,
    project_id: i64,
    record_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All records belonging to a project, any kind, in creation order.
  fn list_project_records(
    &self,
    project_id: i64,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;
}
