//! Core types and trait definitions for the labbook data-tracking backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod project;
pub mod record;
pub mod schema;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
