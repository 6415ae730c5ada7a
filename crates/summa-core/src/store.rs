//! The `SummaryStore` trait.
//!
//! Implemented by storage backends (`summa-store-sqlite`,
//! `summa-store-memory`). Ingestion and read services depend on this
//! abstraction, not on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  subject::Subject,
  summary::{NewSummary, Revision, SummaryRecord, Variant},
};

/// Abstraction over a Summa record store backend.
///
/// Records are append-only. The latest flag is owned by the backend's write
/// path and is never set by callers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait SummaryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Register a new subject under a fresh UUID.
  fn add_subject(
    &self,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Register a subject whose UUID is assigned by the external catalog.
  /// Returns an error if the UUID is already taken.
  fn add_subject_with_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Retrieve a subject by UUID. Returns `None` if not found.
  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Delete a subject and, by cascade, every summary it owns. Returns
  /// `false` if the subject did not exist.
  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Append a new revision for `(input.subject_id, input.variant)` and make
  /// it the latest, atomically.
  ///
  /// Fails with an unknown-subject error if the subject is not registered;
  /// nothing is persisted in that case.
  fn write_summary(
    &self,
    input: NewSummary,
  ) -> impl Future<Output = Result<SummaryRecord, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The record currently flagged latest for a key.
  fn get_latest(
    &self,
    subject_id: Uuid,
    variant: Variant,
  ) -> impl Future<Output = Result<Option<SummaryRecord>, Self::Error>>
  + Send
  + '_;

  /// One specific revision of a key.
  fn get_revision(
    &self,
    subject_id: Uuid,
    variant: Variant,
    revision: Revision,
  ) -> impl Future<Output = Result<Option<SummaryRecord>, Self::Error>>
  + Send
  + '_;

  /// Every revision of a key, most recent first.
  fn get_history(
    &self,
    subject_id: Uuid,
    variant: Variant,
  ) -> impl Future<Output = Result<Vec<SummaryRecord>, Self::Error>>
  + Send
  + '_;

  /// The latest record of every variant the subject has, ordered by variant.
  fn list_variants_latest(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SummaryRecord>, Self::Error>>
  + Send
  + '_;

  /// Check the single-latest and revision-sequence invariants for every
  /// variant of a subject.
  fn verify(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
