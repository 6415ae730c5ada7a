//! Consistency checks over a committed lineage.

use uuid::Uuid;

use crate::{
  Error, Result,
  summary::{SummaryRecord, Variant},
};

/// Verify the records of one `(subject_id, variant)` key: revisions are
/// exactly `1..=n`, and exactly one record is latest, the one with the
/// highest revision. An empty lineage is trivially consistent.
pub fn check_lineage(
  subject_id: Uuid,
  variant: &Variant,
  records: &[SummaryRecord],
) -> Result<()> {
  let violation = |detail: String| Error::PointerInvariantViolation {
    subject_id,
    variant: variant.clone(),
    detail,
  };

  if let Some(stray) = records
    .iter()
    .find(|r| r.subject_id != subject_id || r.variant != *variant)
  {
    return Err(violation(format!(
      "record {}/{}#{} checked under the wrong key",
      stray.subject_id, stray.variant, stray.revision
    )));
  }

  let mut revisions: Vec<u32> =
    records.iter().map(|r| r.revision.get()).collect();
  revisions.sort_unstable();
  for (expected, actual) in (1u32..).zip(&revisions) {
    if *actual != expected {
      return Err(violation(format!(
        "revision sequence breaks at {actual}, expected {expected}"
      )));
    }
  }

  let latest: Vec<&SummaryRecord> =
    records.iter().filter(|r| r.is_latest).collect();
  match (latest.as_slice(), revisions.last()) {
    ([], None) => Ok(()),
    ([head], Some(&max)) if head.revision.get() == max => Ok(()),
    ([head], Some(&max)) => Err(violation(format!(
      "latest is revision {} but the maximum is {max}",
      head.revision
    ))),
    (many, _) => Err(violation(format!(
      "{} records flagged latest, expected 1",
      many.len()
    ))),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::summary::{Revision, SummaryPayload};

  fn variant() -> Variant { Variant::new("bulleted").unwrap() }

  fn record(n: u32, is_latest: bool) -> SummaryRecord {
    let now = Utc::now();
    SummaryRecord {
      subject_id: Uuid::nil(),
      variant: variant(),
      revision: Revision::new(n).unwrap(),
      payload: SummaryPayload { text: format!("v{n}"), html: None },
      content_hash: String::new(),
      is_latest,
      created_at: now,
      updated_at: now,
    }
  }

  fn check(records: &[SummaryRecord]) -> Result<()> {
    check_lineage(Uuid::nil(), &variant(), records)
  }

  #[test]
  fn consistent_lineages_pass() {
    assert!(check(&[]).is_ok());
    assert!(check(&[record(1, true)]).is_ok());
    assert!(
      check(&[record(3, true), record(1, false), record(2, false)]).is_ok()
    );
  }

  #[test]
  fn zero_or_two_latest_fail() {
    assert!(check(&[record(1, false), record(2, false)]).is_err());
    assert!(check(&[record(1, true), record(2, true)]).is_err());
  }

  #[test]
  fn stale_latest_fails() {
    assert!(check(&[record(1, true), record(2, false)]).is_err());
  }

  #[test]
  fn gaps_and_duplicates_fail() {
    assert!(check(&[record(1, false), record(3, true)]).is_err());
    assert!(
      check(&[record(1, false), record(1, false), record(2, true)]).is_err()
    );
    assert!(check(&[record(2, true)]).is_err());
  }

  #[test]
  fn foreign_records_fail() {
    let mut other = record(1, true);
    other.subject_id = Uuid::new_v4();
    assert!(check(&[other]).is_err());
  }
}
