//! Summary records — the versioned unit of the Summa store.
//!
//! A record is identified by `(subject_id, variant, revision)`. Its payload is
//! immutable once written; the only field that ever changes after creation is
//! the latest flag, and only through [`crate::pointer`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Variant ─────────────────────────────────────────────────────────────────

/// Names an independent revision lineage for a subject, e.g.
/// `"comprehensive"` or `"bulleted"`.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Variant(String);

impl Variant {
  pub const MAX_LEN: usize = 64;

  pub fn new(name: impl Into<String>) -> Result<Self> {
    let name = name.into();
    if name.is_empty() || name.len() > Self::MAX_LEN || name.trim() != name {
      return Err(Error::InvalidVariant(name));
    }
    Ok(Self(name))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Variant {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<Variant> for String {
  fn from(value: Variant) -> Self { value.0 }
}

impl FromStr for Variant {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl AsRef<str> for Variant {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Revision ────────────────────────────────────────────────────────────────

/// A revision number within one `(subject, variant)` key. Starts at 1.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u32);

impl Revision {
  pub const FIRST: Self = Self(1);

  /// Returns `None` for zero.
  pub fn new(n: u32) -> Option<Self> { (n >= 1).then_some(Self(n)) }

  pub fn get(self) -> u32 { self.0 }

  /// The revision after this one, or `None` on overflow.
  pub fn next(self) -> Option<Self> { self.0.checked_add(1).map(Self) }
}

impl fmt::Display for Revision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The summary content as delivered by the ingestion pipeline. Opaque to the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
  pub text: String,
  pub html: Option<String>,
}

impl SummaryPayload {
  /// SHA-256 hex digest over the payload. Fields are length-prefixed so
  /// `text`/`html` boundaries cannot collide.
  pub fn content_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update((self.text.len() as u64).to_le_bytes());
    hasher.update(self.text.as_bytes());
    match &self.html {
      Some(html) => {
        hasher.update([1u8]);
        hasher.update((html.len() as u64).to_le_bytes());
        hasher.update(html.as_bytes());
      }
      None => hasher.update([0u8]),
    }
    hex::encode(hasher.finalize())
  }
}

// ─── SummaryRecord ───────────────────────────────────────────────────────────

/// One committed revision of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
  pub subject_id:   Uuid,
  pub variant:      Variant,
  pub revision:     Revision,
  #[serde(flatten)]
  pub payload:      SummaryPayload,
  pub content_hash: String,
  pub is_latest:    bool,
  pub created_at:   DateTime<Utc>,
  /// Equal to `created_at` until the record is demoted from latest.
  pub updated_at:   DateTime<Utc>,
}

// ─── NewSummary ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::SummaryStore::write_summary`].
///
/// There is no revision field: the store allocates revisions and callers
/// cannot override them.
#[derive(Debug, Clone)]
pub struct NewSummary {
  pub subject_id: Uuid,
  pub variant:    Variant,
  pub payload:    SummaryPayload,
}

impl NewSummary {
  pub fn new(
    subject_id: Uuid,
    variant: Variant,
    text: impl Into<String>,
  ) -> Self {
    Self {
      subject_id,
      variant,
      payload: SummaryPayload { text: text.into(), html: None },
    }
  }

  pub fn with_html(mut self, html: impl Into<String>) -> Self {
    self.payload.html = Some(html.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn variant_rejects_blank_and_padded_names() {
    assert!(Variant::new("").is_err());
    assert!(Variant::new(" comprehensive").is_err());
    assert!(Variant::new("bulleted\n").is_err());
    assert!(Variant::new("x".repeat(Variant::MAX_LEN + 1)).is_err());
    assert_eq!(
      Variant::new("comprehensive").unwrap().as_str(),
      "comprehensive"
    );
  }

  #[test]
  fn variant_deserialization_is_validated() {
    let ok: Variant = serde_json::from_str("\"bulleted\"").unwrap();
    assert_eq!(ok.as_str(), "bulleted");
    assert!(serde_json::from_str::<Variant>("\"\"").is_err());
  }

  #[test]
  fn revision_starts_at_one() {
    assert!(Revision::new(0).is_none());
    assert_eq!(Revision::new(1), Some(Revision::FIRST));
    assert_eq!(Revision::FIRST.next().map(Revision::get), Some(2));
    assert!(Revision::new(u32::MAX).unwrap().next().is_none());
  }

  #[test]
  fn content_hash_separates_text_and_html() {
    let a = SummaryPayload { text: "ab".into(), html: Some("c".into()) };
    let b = SummaryPayload { text: "a".into(), html: Some("bc".into()) };
    let c = SummaryPayload { text: "abc".into(), html: None };
    assert_ne!(a.content_hash(), b.content_hash());
    assert_ne!(a.content_hash(), c.content_hash());
    assert_eq!(a.content_hash(), a.clone().content_hash());
    assert_eq!(a.content_hash().len(), 64);
  }
}
