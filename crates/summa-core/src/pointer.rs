//! Revision allocation and latest-pointer maintenance.
//!
//! A write never reacts to its own side effects. Backends read the key's
//! [`LineageHead`] inside their write transaction, call [`plan_write`] once,
//! and commit the resulting [`WritePlan`] as a single unit: insert the new
//! revision flagged latest, demote the previous head. Nothing in the plan is
//! applied as a follow-up to an earlier commit, so there is no chain of
//! reactions to re-enter.
//!
//! Flag transitions are expressed as [`FlagChange`] values. Only a genuine
//! promotion (a record going from not-latest to latest) owes its siblings a
//! correction; the demotion produced in response owes nothing. Feeding a
//! plan's changes back through [`react`] therefore always terminates after one
//! step, however long the lineage is.

use uuid::Uuid;

use crate::{
  Error, Result,
  summary::{Revision, SummaryRecord, Variant},
};

// ─── Observed state ──────────────────────────────────────────────────────────

/// What a backend observed about one `(subject, variant)` key at write time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineageHead {
  /// Highest stored revision, `None` for an empty lineage.
  pub max_revision: Option<Revision>,
  /// Revision currently flagged latest.
  pub latest:       Option<Revision>,
}

impl LineageHead {
  /// Derive the head from the records of a single key.
  ///
  /// Several latest records collapse to the highest one here;
  /// [`crate::invariant::check_lineage`] is what reports that condition.
  pub fn from_records<'a>(
    records: impl IntoIterator<Item = &'a SummaryRecord>,
  ) -> Self {
    records.into_iter().fold(Self::default(), |head, r| Self {
      max_revision: head.max_revision.max(Some(r.revision)),
      latest:       if r.is_latest {
        head.latest.max(Some(r.revision))
      } else {
        head.latest
      },
    })
  }
}

// ─── Flag transitions ────────────────────────────────────────────────────────

/// A transition of one record's latest flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
  pub revision:   Revision,
  pub was_latest: bool,
  pub is_latest:  bool,
}

impl FlagChange {
  pub fn promote(revision: Revision) -> Self {
    Self { revision, was_latest: false, is_latest: true }
  }

  pub fn demote(revision: Revision) -> Self {
    Self { revision, was_latest: true, is_latest: false }
  }

  /// True only when the record actually becomes latest. Demotions and
  /// no-op writes of an unchanged flag request nothing.
  pub fn requests_latest(&self) -> bool { self.is_latest && !self.was_latest }
}

/// The correction `change` owes its siblings, given the head before it.
pub fn react(change: FlagChange, head: &LineageHead) -> Option<FlagChange> {
  if !change.requests_latest() {
    return None;
  }
  head
    .latest
    .filter(|&latest| latest != change.revision)
    .map(FlagChange::demote)
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Every row state a write will commit, computed before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePlan {
  /// The allocated revision for the new record.
  pub revision: Revision,
  /// The new record's flag; always a promotion.
  pub promote:  FlagChange,
  /// The previous head losing its flag, if the lineage was not empty.
  pub demote:   Option<FlagChange>,
}

impl WritePlan {
  /// All flag transitions in the plan, promotion first.
  pub fn changes(&self) -> impl Iterator<Item = FlagChange> + '_ {
    std::iter::once(self.promote).chain(self.demote)
  }
}

/// Allocate the next revision for a key and compute the pointer flip.
///
/// Fails with [`Error::PointerInvariantViolation`] if the observed head is
/// already inconsistent; nothing should be written in that case.
pub fn plan_write(
  subject_id: Uuid,
  variant: &Variant,
  head: &LineageHead,
) -> Result<WritePlan> {
  let violation = |detail: String| Error::PointerInvariantViolation {
    subject_id,
    variant: variant.clone(),
    detail,
  };

  let revision = match (head.max_revision, head.latest) {
    (None, None) => Revision::FIRST,
    (None, Some(latest)) => {
      return Err(violation(format!(
        "revision {latest} flagged latest in an empty lineage"
      )));
    }
    (Some(max), None) => {
      return Err(violation(format!(
        "no latest record among revisions 1..={max}"
      )));
    }
    (Some(max), Some(latest)) if latest != max => {
      return Err(violation(format!(
        "latest is revision {latest} but the maximum is {max}"
      )));
    }
    (Some(max), Some(_)) => max.next().ok_or_else(|| Error::RevisionExhausted {
      subject_id,
      variant: variant.clone(),
    })?,
  };

  let promote = FlagChange::promote(revision);
  let demote = react(promote, head);

  Ok(WritePlan { revision, promote, demote })
}
