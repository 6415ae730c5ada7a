//! Subject — the external entity that summaries belong to.
//!
//! The catalog owning subjects lives outside Summa. The store keeps only the
//! identity and registration time so it can enforce foreign-key integrity and
//! cascade deletes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub created_at: DateTime<Utc>,
}
