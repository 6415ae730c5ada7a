//! `summa` — administer a Summa summary store on disk.
//!
//! # Usage
//!
//! ```text
//! summa subject add
//! summa write <SUBJECT> comprehensive --text-file summary.txt \
//!   --html-file summary.html
//! summa latest <SUBJECT> comprehensive
//! summa history <SUBJECT> comprehensive
//! summa --config ~/.config/summa/summa.toml variants <SUBJECT>
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr (`RUST_LOG`
//! controls verbosity).

mod commands;
mod settings;

use std::{io, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use summa_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::Command;
use settings::{Settings, expand_tilde};

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Versioned summary store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "summa.toml")]
  config: PathBuf,

  /// SQLite database path; overrides `store_path` from the config.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)
    .with_context(|| {
      format!("failed to read config {}", cli.config.display())
    })?;
  if let Some(path) = cli.store {
    settings.store_path = path;
  }

  let store_path = expand_tilde(&settings.store_path);
  let store = SqliteStore::open_with(&store_path, settings.sqlite)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(path = ?store_path, "store opened");

  let mut stdout = io::stdout().lock();
  commands::run(&store, cli.command, &mut stdout).await
}
