//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs are hyphenated lowercase strings,
//! revisions are plain integers and the latest flag is `0`/`1`.

use chrono::{DateTime, Utc};
use summa_core::{
  subject::Subject,
  summary::{Revision, SummaryPayload, SummaryRecord, Variant},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Revision ────────────────────────────────────────────────────────────────

pub fn encode_revision(r: Revision) -> i64 { i64::from(r.get()) }

/// `None` for values outside `1..=u32::MAX`.
pub fn revision_from_column(n: i64) -> Option<Revision> {
  u32::try_from(n).ok().and_then(Revision::new)
}

pub fn decode_revision(n: i64) -> Result<Revision> {
  revision_from_column(n)
    .ok_or_else(|| Error::Decode(format!("revision out of range: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSummary::from_row`].
pub const SUMMARY_COLUMNS: &str = "subject_id, variant, revision, text, html, \
                                   content_hash, is_latest, created_at, \
                                   updated_at";

/// Raw values read directly from a `summaries` row.
pub struct RawSummary {
  pub subject_id:   String,
  pub variant:      String,
  pub revision:     i64,
  pub text:         String,
  pub html:         Option<String>,
  pub content_hash: String,
  pub is_latest:    bool,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:   row.get(0)?,
      variant:      row.get(1)?,
      revision:     row.get(2)?,
      text:         row.get(3)?,
      html:         row.get(4)?,
      content_hash: row.get(5)?,
      is_latest:    row.get(6)?,
      created_at:   row.get(7)?,
      updated_at:   row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<SummaryRecord> {
    Ok(SummaryRecord {
      subject_id:   decode_uuid(&self.subject_id)?,
      variant:      Variant::new(self.variant)?,
      revision:     decode_revision(self.revision)?,
      payload:      SummaryPayload { text: self.text, html: self.html },
      content_hash: self.content_hash,
      is_latest:    self.is_latest,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub created_at: String,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
