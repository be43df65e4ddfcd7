//! [`SqliteStore`] — the SQLite implementation of [`LabStore`].
//!
//! Every write runs as one explicit transaction inside a single
//! [`tokio_rusqlite::Connection::call`] closure: begin → resolve schema →
//! integrity checks → validate payload → insert → commit. A failed check
//! rolls the transaction back, so no write has partial effects.

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};

use labbook_core::{
  Error, Result,
  project::{NewProject, Project},
  record::{self, NewRecord, Record, RecordKind, RecordPatch},
  schema::{NewSchema, SchemaDefinition},
  store::{LabStore, RecordQuery},
  validate,
};

use crate::{
  encode::{
    RawProject, RawRecord, RawSchema, decode_dt, decode_json, decode_kind, encode_dt, encode_json,
    encode_kind,
  },
  schema::SCHEMA,
  storage,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A labbook store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// calls are serialised onto one dedicated database thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(storage)
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

const RECORD_COLUMNS: &str =
  "r.record_id, r.kind, r.name, r.schema_id, r.parent_id, r.payload, r.created_at, r.updated_at";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
  Ok(RawRecord {
    record_id:  row.get(0)?,
    kind:       row.get(1)?,
    name:       row.get(2)?,
    schema_id:  row.get(3)?,
    parent_id:  row.get(4)?,
    payload:    row.get(5)?,
    created_at: row.get(6)?,
    updated_at: row.get(7)?,
  })
}

fn schema_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSchema> {
  Ok(RawSchema {
    schema_id:  row.get(0)?,
    kind:       row.get(1)?,
    title:      row.get(2)?,
    version:    row.get(3)?,
    document:   row.get(4)?,
    created_at: row.get(5)?,
  })
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProject> {
  Ok(RawProject {
    project_id:  row.get(0)?,
    name:        row.get(1)?,
    description: row.get(2)?,
    created_at:  row.get(3)?,
  })
}

/// The gate every record write passes through. Runs inside the caller's
/// transaction.
///
/// Order: resolve schema → kind match → parent topology → payload
/// conformance. The first failure wins and the transaction rolls back.
fn check_record_write(
  tx: &rusqlite::Transaction<'_>,
  kind: RecordKind,
  schema_id: i64,
  parent_id: Option<i64>,
  payload: &serde_json::Value,
) -> std::result::Result<std::result::Result<(), Error>, tokio_rusqlite::Error> {
  let schema_row: Option<(String, String)> = tx
    .query_row(
      "SELECT kind, document FROM schemas WHERE schema_id = ?",
      rusqlite::params![schema_id],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?;

  let Some((schema_kind_str, document_str)) = schema_row else {
    return Ok(Err(Error::SchemaNotFound(schema_id)));
  };

  let schema_kind = match decode_kind(&schema_kind_str) {
    Ok(k) => k,
    Err(e) => return Ok(Err(e)),
  };
  if schema_kind != kind {
    return Ok(Err(Error::SchemaKindMismatch {
      schema: schema_kind,
      record: kind,
    }));
  }

  match (kind.parent_kind(), parent_id) {
    (None, Some(_)) => return Ok(Err(Error::ParentForbidden(kind))),
    (Some(_), None) => return Ok(Err(Error::ParentRequired(kind))),
    (Some(expected), Some(pid)) => {
      let parent_kind_str: Option<String> = tx
        .query_row(
          "SELECT kind FROM records WHERE record_id = ?",
          rusqlite::params![pid],
          |row| row.get(0),
        )
        .optional()?;

      let Some(parent_kind_str) = parent_kind_str else {
        return Ok(Err(Error::RecordNotFound(pid)));
      };
      let found = match decode_kind(&parent_kind_str) {
        Ok(k) => k,
        Err(e) => return Ok(Err(e)),
      };
      if found != expected {
        return Ok(Err(Error::ParentKindMismatch { expected, found }));
      }
    }
    (None, None) => {}
  }

  let document = match serde_json::from_str(&document_str) {
    Ok(doc) => doc,
    Err(e) => return Ok(Err(Error::Storage(format!("corrupt schema document: {e}")))),
  };
  if let Err(e) = validate::validate(payload, &document) {
    return Ok(Err(e));
  }

  Ok(Ok(()))
}

/// Entity names are unique. `exclude` skips the record being updated.
fn check_entity_name(
  tx: &rusqlite::Transaction<'_>,
  kind: RecordKind,
  name: Option<&str>,
  exclude: Option<i64>,
) -> std::result::Result<std::result::Result<(), Error>, tokio_rusqlite::Error> {
  if kind != RecordKind::Entity {
    return Ok(Ok(()));
  }
  let Some(name) = name else {
    return Ok(Err(Error::NameRequired(kind)));
  };

  let taken: Option<i64> = tx
    .query_row(
      "SELECT record_id FROM records WHERE kind = 'entity' AND name = ?",
      rusqlite::params![name],
      |row| row.get(0),
    )
    .optional()?;

  match taken {
    Some(id) if Some(id) != exclude => Ok(Err(Error::DuplicateName(name.to_owned()))),
    _ => Ok(Ok(())),
  }
}

// ─── LabStore impl ───────────────────────────────────────────────────────────

impl LabStore for SqliteStore {
  type Error = Error;

  // ── Schema definitions ────────────────────────────────────────────────────

  async fn define_schema(&self, input: NewSchema) -> Result<SchemaDefinition> {
    if input.version < 1 {
      return Err(Error::InvalidVersion(input.version));
    }
    // Reject malformed documents before they can gate any write.
    validate::check_document(&input.document)?;

    let created_at = Utc::now();
    let kind_str = encode_kind(input.kind).to_owned();
    let title = input.title.clone();
    let version = input.version;
    let document_str = encode_json(&input.document)?;
    let at_str = encode_dt(created_at);

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken: Option<i64> = tx
          .query_row(
            "SELECT schema_id FROM schemas WHERE kind = ? AND title = ? AND version = ?",
            rusqlite::params![kind_str, title, version],
            |row| row.get(0),
          )
          .optional()?;
        if taken.is_some() {
          return Ok(Err(Error::DuplicateVersion {
            kind: input.kind,
            title,
            version,
          }));
        }

        tx.execute(
          "INSERT INTO schemas (kind, title, version, document, created_at)
           VALUES (?, ?, ?, ?, ?)",
          rusqlite::params![kind_str, title, version, document_str, at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(id))
      })
      .await
      .map_err(storage)??;

    Ok(SchemaDefinition {
      id,
      kind: input.kind,
      title: input.title,
      version: input.version,
      document: input.document,
      created_at,
    })
  }

  async fn get_schema(&self, id: i64) -> Result<Option<SchemaDefinition>> {
    let raw: Option<RawSchema> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT schema_id, kind, title, version, document, created_at
               FROM schemas WHERE schema_id = ?",
              rusqlite::params![id],
              schema_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawSchema::into_definition).transpose()
  }

  async fn list_schemas(&self, kind: Option<RecordKind>) -> Result<Vec<SchemaDefinition>> {
    let kind_str = kind.map(encode_kind).map(str::to_owned);

    let raws: Vec<RawSchema> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(k) = kind_str {
          let mut stmt = conn.prepare(
            "SELECT schema_id, kind, title, version, document, created_at
             FROM schemas WHERE kind = ? ORDER BY schema_id",
          )?;
          stmt
            .query_map(rusqlite::params![k], schema_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT schema_id, kind, title, version, document, created_at
             FROM schemas ORDER BY schema_id",
          )?;
          stmt
            .query_map([], schema_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawSchema::into_definition).collect()
  }

  async fn delete_schema(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM schemas WHERE schema_id = ?",
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(Err(Error::SchemaNotFound(id)));
        }

        // Protect-on-delete; the FK RESTRICT clause is the backstop.
        let referenced: bool = tx
          .query_row(
            "SELECT 1 FROM records WHERE schema_id = ? LIMIT 1",
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if referenced {
          return Ok(Err(Error::SchemaInUse(id)));
        }

        tx.execute("DELETE FROM schemas WHERE schema_id = ?", rusqlite::params![id])?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .map_err(storage)?
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn create_record(&self, input: NewRecord) -> Result<Record> {
    let now = Utc::now();
    let kind = input.kind;
    let kind_str = encode_kind(kind).to_owned();
    let payload_str = encode_json(&input.payload)?;
    let at_str = encode_dt(now);

    let name = input.name.clone();
    let payload = input.payload.clone();
    let schema_id = input.schema_id;
    let parent_id = input.parent_id;

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Err(e) =
          check_record_write(&tx, kind, input.schema_id, input.parent_id, &input.payload)?
        {
          return Ok(Err(e));
        }
        if let Err(e) = check_entity_name(&tx, kind, input.name.as_deref(), None)? {
          return Ok(Err(e));
        }

        tx.execute(
          "INSERT INTO records (kind, name, schema_id, parent_id, payload, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)",
          rusqlite::params![
            kind_str,
            input.name,
            input.schema_id,
            input.parent_id,
            payload_str,
            at_str,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(id))
      })
      .await
      .map_err(storage)??;

    let barcode = record::barcode(kind, id, &payload);
    Ok(Record {
      id,
      kind,
      name,
      schema_id,
      parent_id,
      payload,
      barcode,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get_record(&self, id: i64) -> Result<Option<Record>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM records r WHERE r.record_id = ?");
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], record_from_row)
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn list_records(&self, kind: RecordKind, query: &RecordQuery) -> Result<Vec<Record>> {
    let kind_str = encode_kind(kind).to_owned();
    let query = query.clone();

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        // Equality filters compose before pagination; creation order is
        // stable because record_id is monotonic.
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM records r");
        let mut params: Vec<SqlValue> = Vec::new();

        sql.push_str(" JOIN schemas s ON s.schema_id = r.schema_id");
        if let Some(project_id) = query.project_id {
          sql.push_str(
            " JOIN project_members pm ON pm.record_id = r.record_id AND pm.project_id = ?",
          );
          params.push(SqlValue::Integer(project_id));
        }

        sql.push_str(" WHERE r.kind = ?");
        params.push(SqlValue::Text(kind_str));

        if let Some(title) = query.schema_title {
          sql.push_str(" AND s.title = ?");
          params.push(SqlValue::Text(title));
        }
        if let Some(version) = query.schema_version {
          sql.push_str(" AND s.version = ?");
          params.push(SqlValue::Integer(i64::from(version)));
        }
        if let Some(parent_id) = query.parent_id {
          sql.push_str(" AND r.parent_id = ?");
          params.push(SqlValue::Integer(parent_id));
        }

        sql.push_str(" ORDER BY r.record_id LIMIT ? OFFSET ?");
        params.push(SqlValue::Integer(query.limit.map_or(-1, i64::from)));
        params.push(SqlValue::Integer(i64::from(query.offset.unwrap_or(0))));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), record_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn update_record(&self, id: i64, patch: RecordPatch) -> Result<Record> {
    let now = Utc::now();
    let payload_str = encode_json(&patch.payload)?;
    let at_str = encode_dt(now);

    // The returned record is assembled inside the transaction: a concurrent
    // delete after commit cannot turn a committed update into a phantom.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<(String, Option<String>, i64, Option<i64>, String, String)> = tx
          .query_row(
            "SELECT kind, name, schema_id, parent_id, payload, created_at
             FROM records WHERE record_id = ?",
            rusqlite::params![id],
            |row| {
              Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
              ))
            },
          )
          .optional()?;
        let Some((kind_str, current_name, current_schema, parent_id, current_payload, created_str)) =
          current
        else {
          return Ok(Err(Error::RecordNotFound(id)));
        };
        let kind = match decode_kind(&kind_str) {
          Ok(k) => k,
          Err(e) => return Ok(Err(e)),
        };
        let created_at = match decode_dt(&created_str) {
          Ok(dt) => dt,
          Err(e) => return Ok(Err(e)),
        };

        let schema_id = patch.schema_id.unwrap_or(current_schema);
        let name = patch.name.or(current_name);

        // An entity's barcode prefix is pinned at create.
        if kind == RecordKind::Entity {
          let current_payload = match decode_json(&current_payload) {
            Ok(v) => v,
            Err(e) => return Ok(Err(e)),
          };
          if record::entity_prefix(&patch.payload) != record::entity_prefix(&current_payload) {
            return Ok(Err(Error::PrefixImmutable(id)));
          }
        }

        // Same gate as create; the parent link never changes on update.
        if let Err(e) = check_record_write(&tx, kind, schema_id, parent_id, &patch.payload)? {
          return Ok(Err(e));
        }
        if let Err(e) = check_entity_name(&tx, kind, name.as_deref(), Some(id))? {
          return Ok(Err(e));
        }

        tx.execute(
          "UPDATE records SET name = ?, schema_id = ?, payload = ?, updated_at = ?
           WHERE record_id = ?",
          rusqlite::params![name, schema_id, payload_str, at_str, id],
        )?;
        tx.commit()?;

        let barcode = record::barcode(kind, id, &patch.payload);
        Ok(Ok(Record {
          id,
          kind,
          name,
          schema_id,
          parent_id,
          payload: patch.payload,
          barcode,
          created_at,
          updated_at: now,
        }))
      })
      .await
      .map_err(storage)?
  }

  async fn delete_record(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let kind_str: Option<String> = tx
          .query_row(
            "SELECT kind FROM records WHERE record_id = ?",
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(kind_str) = kind_str else {
          return Ok(Err(Error::RecordNotFound(id)));
        };

        // PROTECT check; the DDL trigger is the backstop.
        if kind_str == "entity" {
          let has_dependents: bool = tx
            .query_row(
              "SELECT 1 FROM records WHERE parent_id = ? LIMIT 1",
              rusqlite::params![id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if has_dependents {
            return Ok(Err(Error::RecordProtected(id)));
          }
        }

        // CASCADE-typed children go with the row, transitively.
        tx.execute("DELETE FROM records WHERE record_id = ?", rusqlite::params![id])?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .map_err(storage)?
  }

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    let created_at = Utc::now();
    let name = input.name.clone();
    let description = input.description.clone();
    let at_str = encode_dt(created_at);

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM projects WHERE name = ?",
            rusqlite::params![name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(Err(Error::DuplicateName(name)));
        }

        tx.execute(
          "INSERT INTO projects (name, description, created_at) VALUES (?, ?, ?)",
          rusqlite::params![name, description, at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(id))
      })
      .await
      .map_err(storage)??;

    Ok(Project {
      id,
      name: input.name,
      description: input.description,
      created_at,
    })
  }

  async fn get_project(&self, id: i64) -> Result<Option<Project>> {
    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT project_id, name, description, created_at
               FROM projects WHERE project_id = ?",
              rusqlite::params![id],
              project_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawProject::into_project).transpose()
  }

  async fn list_projects(&self) -> Result<Vec<Project>> {
    let raws: Vec<RawProject> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT project_id, name, description, created_at
           FROM projects ORDER BY project_id",
        )?;
        let rows = stmt
          .query_map([], project_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawProject::into_project).collect()
  }

  async fn delete_project(&self, id: i64) -> Result<()> {
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM projects WHERE project_id = ?",
          rusqlite::params![id],
        )?)
      })
      .await
      .map_err(storage)?;

    if deleted == 0 {
      return Err(Error::ProjectNotFound(id));
    }
    Ok(())
  }

  async fn add_to_project(&self, project_id: i64, record_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let project_exists: bool = tx
          .query_row(
            "SELECT 1 FROM projects WHERE project_id = ?",
            rusqlite::params![project_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !project_exists {
          return Ok(Err(Error::ProjectNotFound(project_id)));
        }

        let record_exists: bool = tx
          .query_row(
            "SELECT 1 FROM records WHERE record_id = ?",
            rusqlite::params![record_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !record_exists {
          return Ok(Err(Error::RecordNotFound(record_id)));
        }

        // Membership is a set: adding twice is a no-op.
        tx.execute(
          "INSERT OR IGNORE INTO project_members (project_id, record_id) VALUES (?, ?)",
          rusqlite::params![project_id, record_id],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .map_err(storage)?
  }

  async fn remove_from_project(&self, project_id: i64, record_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let project_exists: bool = conn
          .query_row(
            "SELECT 1 FROM projects WHERE project_id = ?",
            rusqlite::params![project_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !project_exists {
          return Ok(Err(Error::ProjectNotFound(project_id)));
        }

        // Removing an absent membership is a no-op.
        conn.execute(
          "DELETE FROM project_members WHERE project_id = ? AND record_id = ?",
          rusqlite::params![project_id, record_id],
        )?;
        Ok(Ok(()))
      })
      .await
      .map_err(storage)?
  }

  async fn list_project_records(&self, project_id: i64) -> Result<Vec<Record>> {
    let sql = format!(
      "SELECT {RECORD_COLUMNS} FROM records r
       JOIN project_members pm ON pm.record_id = r.record_id
       WHERE pm.project_id = ?
       ORDER BY r.record_id"
    );

    let raws: Result<Vec<RawRecord>> = self
      .conn
      .call(move |conn| {
        let project_exists: bool = conn
          .query_row(
            "SELECT 1 FROM projects WHERE project_id = ?",
            rusqlite::params![project_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !project_exists {
          return Ok(Err(Error::ProjectNotFound(project_id)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![project_id], record_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Ok(rows))
      })
      .await
      .map_err(storage)?;

    raws?.into_iter().map(RawRecord::into_record).collect()
  }
}
