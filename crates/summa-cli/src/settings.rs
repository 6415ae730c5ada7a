//! Layered configuration: optional TOML file, then `SUMMA_*` environment
//! variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use summa_store_sqlite::SqliteOptions;

/// Shape of `summa.toml`.
///
/// ```toml
/// store_path = "~/.local/share/summa/summa.db"
///
/// [sqlite]
/// max_write_attempts = 5
/// busy_timeout_ms    = 5000
/// ```
#[derive(Debug, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub sqlite:     SqliteOptions,
}

fn default_store_path() -> PathBuf { PathBuf::from("summa.db") }

impl Settings {
  /// Read `path` if it exists, then apply environment overrides such as
  /// `SUMMA_STORE_PATH` or `SUMMA_SQLITE__BUSY_TIMEOUT_MS`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("SUMMA")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let settings =
      Settings::load(Path::new("/nonexistent/summa.toml")).unwrap();
    assert_eq!(settings.sqlite.max_write_attempts, 5);
    assert_eq!(settings.sqlite.busy_timeout_ms, 5_000);
  }

  #[test]
  fn file_values_are_read() {
    let path = std::env::temp_dir()
      .join(format!("summa-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
      &path,
      "store_path = \"/var/lib/summa.db\"\n\n[sqlite]\nmax_write_attempts = 2\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(settings.store_path, PathBuf::from("/var/lib/summa.db"));
    assert_eq!(settings.sqlite.max_write_attempts, 2);
    assert_eq!(settings.sqlite.busy_timeout_ms, 5_000);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/summa.db")),
      PathBuf::from(home).join("summa.db")
    );
    assert_eq!(
      expand_tilde(Path::new("/abs/summa.db")),
      PathBuf::from("/abs/summa.db")
    );
  }
}
