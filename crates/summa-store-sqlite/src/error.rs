//! Error type for `summa-store-sqlite`.

use summa_core::summary::Variant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(summa_core::Error),

  /// The durability layer failed; the write (if any) was rolled back.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("malformed row: {0}")]
  Decode(String),

  #[error("unknown subject: {0}")]
  UnknownSubject(Uuid),

  #[error("subject already exists: {0}")]
  SubjectExists(Uuid),

  #[error("revision conflict on {subject_id}/{variant} after {attempts} attempts")]
  RevisionConflict {
    subject_id: Uuid,
    variant:    Variant,
    attempts:   u32,
  },

  #[error("latest-pointer invariant violated on {subject_id}/{variant}: {detail}")]
  PointerInvariantViolation {
    subject_id: Uuid,
    variant:    Variant,
    detail:     String,
  },
}

impl From<summa_core::Error> for Error {
  fn from(err: summa_core::Error) -> Self {
    use summa_core::Error as Core;
    match err {
      Core::UnknownSubject(id) => Self::UnknownSubject(id),
      Core::SubjectExists(id) => Self::SubjectExists(id),
      Core::RevisionConflict { subject_id, variant, attempts } => {
        Self::RevisionConflict { subject_id, variant, attempts }
      }
      Core::PointerInvariantViolation { subject_id, variant, detail } => {
        Self::PointerInvariantViolation { subject_id, variant, detail }
      }
      other => Self::Core(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
