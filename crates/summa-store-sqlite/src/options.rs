//! Connection and write-retry settings.

use std::time::Duration;

use serde::Deserialize;

/// Tuning for a [`crate::SqliteStore`], usually read from the `[sqlite]`
/// section of the application config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
  /// Attempts per write before a revision conflict is reported. Zero is
  /// treated as one.
  pub max_write_attempts: u32,
  /// How long SQLite waits on another connection's lock before an attempt
  /// counts as contended.
  pub busy_timeout_ms:    u64,
}

impl Default for SqliteOptions {
  fn default() -> Self {
    Self { max_write_attempts: 5, busy_timeout_ms: 5_000 }
  }
}

impl SqliteOptions {
  pub(crate) fn attempts(&self) -> u32 { self.max_write_attempts.max(1) }

  pub(crate) fn busy_timeout(&self) -> Duration {
    Duration::from_millis(self.busy_timeout_ms)
  }

  /// Pause before retry number `attempt` (1-based).
  pub(crate) fn backoff(&self, attempt: u32) -> Duration {
    Duration::from_millis(10 * u64::from(attempt))
  }
}
