//! SQLite backend for the labbook store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Referential integrity — the
//! unique schema-version index, PROTECT and CASCADE references — is declared
//! in the DDL, so direct programmatic use cannot bypass it.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;


use labbook_core::Error;

/// Convert a backend fault into the shared domain error.
fn storage(e: impl std::fmt::Display) -> Error { Error::Storage(e.to_string()) }
