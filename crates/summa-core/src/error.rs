//! Error types for `summa-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::summary::Variant;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown subject: {0}")]
  UnknownSubject(Uuid),

  #[error("subject already exists: {0}")]
  SubjectExists(Uuid),

  #[error("invalid variant {0:?}: must be 1-64 bytes with no surrounding whitespace")]
  InvalidVariant(String),

  /// Concurrent writers kept racing for the next revision of this key.
  #[error("revision conflict on {subject_id}/{variant} after {attempts} attempts")]
  RevisionConflict {
    subject_id: Uuid,
    variant:    Variant,
    attempts:   u32,
  },

  /// The single-latest invariant does not hold for a key. Never retried.
  #[error("latest-pointer invariant violated on {subject_id}/{variant}: {detail}")]
  PointerInvariantViolation {
    subject_id: Uuid,
    variant:    Variant,
    detail:     String,
  },

  #[error("revision space exhausted on {subject_id}/{variant}")]
  RevisionExhausted { subject_id: Uuid, variant: Variant },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
