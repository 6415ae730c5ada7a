//! [`MemoryStore`] — a non-durable [`SummaryStore`] with per-key locking.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
  },
};

use chrono::Utc;
use uuid::Uuid;

use summa_core::{
  Error, Result, invariant,
  pointer::{self, LineageHead},
  store::SummaryStore,
  subject::Subject,
  summary::{NewSummary, Revision, SummaryRecord, Variant},
};

/// Records of one key in ascending revision order.
pub(crate) type Lineage = Arc<Mutex<Vec<SummaryRecord>>>;

#[derive(Default)]
struct Inner {
  /// Held shared by every write for its whole duration and exclusively by
  /// subject deletion, so no write lands on a subject being removed.
  subjects: RwLock<HashMap<Uuid, Subject>>,
  /// Only guards the key → lineage map; lineage contents have their own lock.
  lineages: RwLock<HashMap<Uuid, BTreeMap<Variant, Lineage>>>,
}

/// A Summa store held entirely in memory.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
  lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn records_of(lineage: &Lineage) -> Vec<SummaryRecord> { lock(lineage).clone() }

fn latest_of(lineage: &Lineage) -> Option<SummaryRecord> {
  lock(lineage).iter().rev().find(|r| r.is_latest).cloned()
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  pub(crate) fn lineage(
    &self,
    subject_id: Uuid,
    variant: &Variant,
  ) -> Option<Lineage> {
    read(&self.inner.lineages)
      .get(&subject_id)
      .and_then(|variants| variants.get(variant))
      .cloned()
  }

  fn lineage_or_create(&self, subject_id: Uuid, variant: &Variant) -> Lineage {
    if let Some(existing) = self.lineage(subject_id, variant) {
      return existing;
    }
    write(&self.inner.lineages)
      .entry(subject_id)
      .or_default()
      .entry(variant.clone())
      .or_default()
      .clone()
  }

  fn snapshot(
    &self,
    subject_id: Uuid,
    variant: &Variant,
  ) -> Vec<SummaryRecord> {
    self
      .lineage(subject_id, variant)
      .map(|lineage| records_of(&lineage))
      .unwrap_or_default()
  }

  fn variants(&self, subject_id: Uuid) -> Vec<(Variant, Lineage)> {
    read(&self.inner.lineages)
      .get(&subject_id)
      .map(|variants| {
        variants
          .iter()
          .map(|(v, l)| (v.clone(), Arc::clone(l)))
          .collect()
      })
      .unwrap_or_default()
  }
}

impl SummaryStore for MemoryStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self) -> Result<Subject> {
    self.add_subject_with_id(Uuid::new_v4()).await
  }

  async fn add_subject_with_id(&self, id: Uuid) -> Result<Subject> {
    let mut subjects = write(&self.inner.subjects);
    if subjects.contains_key(&id) {
      return Err(Error::SubjectExists(id));
    }
    let subject = Subject { subject_id: id, created_at: Utc::now() };
    subjects.insert(id, subject.clone());
    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    Ok(read(&self.inner.subjects).get(&id).cloned())
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let mut subjects = write(&self.inner.subjects);
    let existed = subjects.remove(&id).is_some();
    write(&self.inner.lineages).remove(&id);

    if existed {
      tracing::info!(subject_id = %id, "deleted subject and its summaries");
    }
    Ok(existed)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn write_summary(&self, input: NewSummary) -> Result<SummaryRecord> {
    let subjects = read(&self.inner.subjects);
    if !subjects.contains_key(&input.subject_id) {
      return Err(Error::UnknownSubject(input.subject_id));
    }

    let lineage = self.lineage_or_create(input.subject_id, &input.variant);
    let mut records = lock(&lineage);

    let head = LineageHead::from_records(records.iter());
    let plan = pointer::plan_write(input.subject_id, &input.variant, &head)?;

    let now = Utc::now();
    let content_hash = input.payload.content_hash();
    let record = SummaryRecord {
      subject_id: input.subject_id,
      variant: input.variant,
      revision: plan.revision,
      payload: input.payload,
      content_hash,
      is_latest: plan.promote.is_latest,
      created_at: now,
      updated_at: now,
    };

    // Nothing below can fail, so the plan is applied whole or not at all.
    if let Some(demote) = plan.demote {
      for old in records.iter_mut().filter(|r| r.revision == demote.revision) {
        old.is_latest = demote.is_latest;
        old.updated_at = now;
      }
    }
    records.push(record.clone());
    drop(records);
    drop(subjects);

    tracing::debug!(
      subject_id = %record.subject_id,
      variant = %record.variant,
      revision = %record.revision,
      "summary written"
    );
    Ok(record)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_latest(
    &self,
    subject_id: Uuid,
    variant: Variant,
  ) -> Result<Option<SummaryRecord>> {
    Ok(
      self
        .lineage(subject_id, &variant)
        .and_then(|lineage| latest_of(&lineage)),
    )
  }

  async fn get_revision(
    &self,
    subject_id: Uuid,
    variant: Variant,
    revision: Revision,
  ) -> Result<Option<SummaryRecord>> {
    Ok(
      self
        .snapshot(subject_id, &variant)
        .into_iter()
        .find(|r| r.revision == revision),
    )
  }

  async fn get_history(
    &self,
    subject_id: Uuid,
    variant: Variant,
  ) -> Result<Vec<SummaryRecord>> {
    let mut records = self.snapshot(subject_id, &variant);
    records.reverse();
    Ok(records)
  }

  async fn list_variants_latest(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<SummaryRecord>> {
    Ok(
      self
        .variants(subject_id)
        .into_iter()
        .filter_map(|(_, lineage)| latest_of(&lineage))
        .collect(),
    )
  }

  async fn verify(&self, subject_id: Uuid) -> Result<()> {
    for (variant, lineage) in self.variants(subject_id) {
      invariant::check_lineage(subject_id, &variant, &lock(&lineage))?;
    }
    Ok(())
  }
}
