//! Project grouping — a flat, many-to-many bucket over records.
//!
//! Membership carries no order and no payload of its own; it disappears when
//! either side is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id:          i64,
  /// Unique across all projects.
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::LabStore::create_project`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
  pub name:        String,
  pub description: Option<String>,
}
