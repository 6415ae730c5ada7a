//! Subcommands and their execution against any [`SummaryStore`].

use std::{io::Write, path::PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use summa_core::{
  store::SummaryStore,
  summary::{NewSummary, Variant},
};
use uuid::Uuid;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Register or remove subjects.
  #[command(subcommand)]
  Subject(SubjectCommand),

  /// Write a new revision and make it the latest.
  Write(WriteArgs),

  /// Print the latest revision of a variant.
  Latest { subject: Uuid, variant: Variant },

  /// Print every revision of a variant, newest first.
  History { subject: Uuid, variant: Variant },

  /// Print the latest revision of every variant of a subject.
  Variants { subject: Uuid },

  /// Verify the single-latest invariant for every variant of a subject.
  Check { subject: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum SubjectCommand {
  /// Register a subject, optionally under a catalog-assigned UUID.
  Add {
    #[arg(long)]
    id: Option<Uuid>,
  },
  /// Delete a subject and all of its summaries.
  Rm { id: Uuid },
}

#[derive(Args, Debug)]
pub struct WriteArgs {
  pub subject: Uuid,
  pub variant: Variant,

  /// Plain-text summary.
  #[arg(
    long,
    required_unless_present = "text_file",
    conflicts_with = "text_file"
  )]
  pub text: Option<String>,

  /// Read the plain-text summary from a file.
  #[arg(long, value_name = "FILE")]
  pub text_file: Option<PathBuf>,

  /// HTML rendering of the summary.
  #[arg(long, conflicts_with = "html_file")]
  pub html: Option<String>,

  /// Read the HTML rendering from a file.
  #[arg(long, value_name = "FILE")]
  pub html_file: Option<PathBuf>,
}

fn inline_or_file(
  inline: Option<String>,
  file: Option<PathBuf>,
) -> Result<Option<String>> {
  match (inline, file) {
    (Some(value), _) => Ok(Some(value)),
    (None, Some(path)) => std::fs::read_to_string(&path)
      .map(Some)
      .with_context(|| format!("reading {}", path.display())),
    (None, None) => Ok(None),
  }
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
  serde_json::to_writer_pretty(&mut *out, value)?;
  writeln!(out)?;
  Ok(())
}

/// Execute `command` against `store`, writing JSON results to `out`.
pub async fn run<S>(
  store: &S,
  command: Command,
  out: &mut impl Write,
) -> Result<()>
where
  S: SummaryStore,
{
  match command {
    Command::Subject(SubjectCommand::Add { id }) => {
      let subject = match id {
        Some(id) => store.add_subject_with_id(id).await?,
        None => store.add_subject().await?,
      };
      print_json(out, &subject)
    }

    Command::Subject(SubjectCommand::Rm { id }) => {
      if !store.delete_subject(id).await? {
        bail!("subject {id} not found");
      }
      tracing::info!(subject_id = %id, "subject removed");
      Ok(())
    }

    Command::Write(args) => {
      let Some(text) = inline_or_file(args.text, args.text_file)? else {
        bail!("one of --text or --text-file is required");
      };
      let mut input = NewSummary::new(args.subject, args.variant, text);
      if let Some(html) = inline_or_file(args.html, args.html_file)? {
        input = input.with_html(html);
      }
      let record = store.write_summary(input).await?;
      print_json(out, &record)
    }

    Command::Latest { subject, variant } => {
      match store.get_latest(subject, variant.clone()).await? {
        Some(record) => print_json(out, &record),
        None => bail!("no summary for {subject}/{variant}"),
      }
    }

    Command::History { subject, variant } => {
      print_json(out, &store.get_history(subject, variant).await?)
    }

    Command::Variants { subject } => {
      print_json(out, &store.list_variants_latest(subject).await?)
    }

    Command::Check { subject } => {
      store.verify(subject).await?;
      tracing::info!(subject_id = %subject, "all variants consistent");
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use clap::Parser;
  use summa_core::summary::SummaryRecord;
  use summa_store_memory::MemoryStore;

  use super::*;
  use crate::Cli;

  fn parse(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("summa").chain(args.iter().copied()))
      .unwrap()
      .command
  }

  async fn exec(store: &MemoryStore, args: &[&str]) -> Result<String> {
    let mut out = Vec::new();
    run(store, parse(args), &mut out).await?;
    Ok(String::from_utf8(out)?)
  }

  #[test]
  fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }

  #[test]
  fn invalid_variant_is_a_parse_error() {
    let id = Uuid::new_v4().to_string();
    let id = id.as_str();
    let result = Cli::try_parse_from(["summa", "latest", id, " padded"]);
    assert!(result.is_err());
  }

  #[test]
  fn write_requires_text() {
    let id = Uuid::new_v4().to_string();
    let id = id.as_str();
    let result = Cli::try_parse_from(["summa", "write", id, "bulleted"]);
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn write_then_read_latest_and_history() {
    let store = MemoryStore::new();
    let id = Uuid::new_v4().to_string();
    let id = id.as_str();

    exec(&store, &["subject", "add", "--id", id]).await.unwrap();
    exec(&store, &["write", id, "comprehensive", "--text", "v1"])
      .await
      .unwrap();
    exec(&store, &[
      "write", id, "comprehensive", "--text", "v2", "--html", "<p>v2</p>",
    ])
    .await
    .unwrap();

    let out = exec(&store, &["latest", id, "comprehensive"]).await.unwrap();
    let latest: SummaryRecord = serde_json::from_str(&out).unwrap();
    assert_eq!(latest.revision.get(), 2);
    assert_eq!(latest.payload.html.as_deref(), Some("<p>v2</p>"));

    let out = exec(&store, &["history", id, "comprehensive"]).await.unwrap();
    let history: Vec<SummaryRecord> = serde_json::from_str(&out).unwrap();
    assert_eq!(history.len(), 2);
    assert!(!history[1].is_latest);

    exec(&store, &["check", id]).await.unwrap();
  }

  #[tokio::test]
  async fn missing_latest_and_unknown_subject_fail() {
    let store = MemoryStore::new();
    let id = Uuid::new_v4().to_string();
    let id = id.as_str();

    let write = exec(&store, &["write", id, "bulleted", "--text", "x"]).await;
    assert!(write.is_err());

    exec(&store, &["subject", "add", "--id", id]).await.unwrap();
    assert!(exec(&store, &["latest", id, "bulleted"]).await.is_err());

    exec(&store, &["subject", "rm", id]).await.unwrap();
    assert!(exec(&store, &["subject", "rm", id]).await.is_err());
  }

  #[tokio::test]
  async fn variants_lists_one_record_per_variant() {
    let store = MemoryStore::new();
    let id = Uuid::new_v4().to_string();
    let id = id.as_str();
    exec(&store, &["subject", "add", "--id", id]).await.unwrap();
    let writes =
      [("bulleted", "b1"), ("comprehensive", "c1"), ("bulleted", "b2")];
    for (variant, text) in writes {
      exec(&store, &["write", id, variant, "--text", text]).await.unwrap();
    }

    let out = exec(&store, &["variants", id]).await.unwrap();
    let latest: Vec<SummaryRecord> = serde_json::from_str(&out).unwrap();
    let texts: Vec<_> =
      latest.iter().map(|r| r.payload.text.as_str()).collect();
    assert_eq!(texts, ["b2", "c1"]);
  }
}
