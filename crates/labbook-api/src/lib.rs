//! JSON REST API for labbook.
//!
//! Exposes an axum [`Router`] backed by any [`labbook_core::store::LabStore`].
//! TLS and transport concerns are the caller's responsibility.
//!
//! One generic handler set serves all six record collections; the
//! `{collection}` path segment selects the kind. Writes pass through the
//! store's validation gate; reads never validate.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", labbook_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod projects;
pub mod records;
pub mod schemas;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use labbook_core::store::LabStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: LabStore<Error = labbook_core::Error> + Send + Sync + 'static,
{
  Router::new()
    // Schema definitions — no update route exists, by design.
    .route("/schemas", get(schemas::list::<S>).post(schemas::create::<S>))
    .route(
      "/schemas/{id}",
      get(schemas::get_one::<S>).delete(schemas::delete_one::<S>),
    )
    // Projects
    .route("/projects", get(projects::list::<S>).post(projects::create::<S>))
    .route(
      "/projects/{id}",
      get(projects::get_one::<S>).delete(projects::delete_one::<S>),
    )
    .route("/projects/{id}/records", get(projects::records::<S>))
    .route(
      "/projects/{id}/records/{record_id}",
      put(projects::add_record::<S>).delete(projects::remove_record::<S>),
    )
    // Nested Sample→Results projection
    .route("/samples/{id}/results", get(records::sample_results::<S>))
    // Generic record collections: entities, materials, batches, samples,
    // analyses, results
    .route(
      "/{collection}",
      get(records::list::<S>).post(records::create::<S>),
    )
    .route(
      "/{collection}/{id}",
      get(records::get_one::<S>)
        .put(records::update_one::<S>)
        .delete(records::delete_one::<S>),
    )
    .with_state(store)
}
