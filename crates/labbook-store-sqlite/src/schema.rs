//! SQL schema for the labbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Schema definitions are immutable once stored.
-- No UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS schemas (
    schema_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL,     -- record kind this definition validates
    title       TEXT NOT NULL,
    version     INTEGER NOT NULL CHECK (version >= 1),
    document    TEXT NOT NULL,     -- JSON-Schema document, stored verbatim
    created_at  TEXT NOT NULL,     -- ISO 8601 UTC; server-assigned
    UNIQUE (kind, title, version)
);

CREATE TABLE IF NOT EXISTS records (
    record_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL,     -- 'entity' | 'material' | 'batch' | 'sample' | 'analysis' | 'result'
    name        TEXT,
    schema_id   INTEGER NOT NULL REFERENCES schemas(schema_id) ON DELETE RESTRICT,
    parent_id   INTEGER REFERENCES records(record_id) ON DELETE CASCADE,
    payload     TEXT NOT NULL,     -- schema-validated JSON
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Entity names are unique; other kinds may repeat names freely.
CREATE UNIQUE INDEX IF NOT EXISTS records_entity_name_idx
    ON records(name) WHERE kind = 'entity';

CREATE INDEX IF NOT EXISTS records_kind_idx   ON records(kind);
CREATE INDEX IF NOT EXISTS records_parent_idx ON records(parent_id);
CREATE INDEX IF NOT EXISTS records_schema_idx ON records(schema_id);

-- The one PROTECT edge the self-referencing cascade FK cannot express:
-- an entity cannot be deleted while materials still classify against it.
CREATE TRIGGER IF NOT EXISTS records_entity_protect
    BEFORE DELETE ON records
    WHEN OLD.kind = 'entity'
     AND EXISTS (SELECT 1 FROM records WHERE parent_id = OLD.record_id)
BEGIN
    SELECT RAISE(ABORT, 'record protected');
END;

CREATE TABLE IF NOT EXISTS projects (
    project_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL
);

-- Unordered many-to-many grouping; rows vanish with either side.
CREATE TABLE IF NOT EXISTS project_members (
    project_id  INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    record_id   INTEGER NOT NULL REFERENCES records(record_id)  ON DELETE CASCADE,
    UNIQUE (project_id, record_id)
);

CREATE INDEX IF NOT EXISTS project_members_record_idx ON project_members(record_id);

PRAGMA user_version = 1;
";
