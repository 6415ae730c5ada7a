//! [`SqliteStore`] — the SQLite implementation of [`SummaryStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::Utc;
use rusqlite::{
  ErrorCode, OptionalExtension as _, TransactionBehavior, types::Value,
};
use uuid::Uuid;

use summa_core::{
  invariant,
  pointer::{self, LineageHead, WritePlan},
  store::SummaryStore,
  subject::Subject,
  summary::{NewSummary, Revision, SummaryRecord, Variant},
};

use crate::{
  Error, Result, SqliteOptions,
  encode::{
    RawSubject, RawSummary, SUMMARY_COLUMNS, encode_dt, encode_revision,
    encode_uuid, revision_from_column,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Summa store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Separate
/// stores may open the same file; their writers are serialised by SQLite.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  options: SqliteOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, SqliteOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(
    path: impl AsRef<Path>,
    options: SqliteOptions,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, options).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, SqliteOptions::default()).await
  }

  async fn init(
    conn: tokio_rusqlite::Connection,
    options: SqliteOptions,
  ) -> Result<Self> {
    let busy_timeout = options.busy_timeout();
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, options })
  }

  /// Run a `SELECT` over `summaries` and decode every row.
  async fn select_summaries(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<SummaryRecord>> {
    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawSummary::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_record).collect()
  }
}

// ─── Write transaction ───────────────────────────────────────────────────────

/// Everything one write attempt needs, owned so it can cross into the
/// connection thread.
#[derive(Clone)]
struct PendingWrite {
  subject_id: Uuid,
  variant:    Variant,
  text:       String,
  html:       Option<String>,
  hash:       String,
  now:        String,
}

enum WriteOutcome {
  Committed(Revision),
  UnknownSubject,
  /// Another connection held the lock or took the revision; retry.
  Contended,
  /// The key is inconsistent; nothing was written and retrying won't help.
  Rejected(summa_core::Error),
}

/// Busy/locked databases and key collisions are races for the next revision.
fn is_contention(err: &rusqlite::Error) -> bool {
  match err {
    rusqlite::Error::SqliteFailure(e, _) => {
      matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    }
    _ => false,
  }
}

/// Allocate, insert and flip the latest pointer inside one immediate
/// transaction. Any early return drops the transaction, rolling it back.
fn write_in_tx(
  conn: &mut rusqlite::Connection,
  w: &PendingWrite,
) -> rusqlite::Result<WriteOutcome> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let subject_id = encode_uuid(w.subject_id);
  let variant = w.variant.as_str();

  let known = tx
    .query_row(
      "SELECT 1 FROM subjects WHERE subject_id = ?1",
      rusqlite::params![subject_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if !known {
    return Ok(WriteOutcome::UnknownSubject);
  }

  let (max_rev, latest_rev): (Option<i64>, Option<i64>) = tx.query_row(
    "SELECT MAX(revision), MAX(CASE WHEN is_latest = 1 THEN revision END)
     FROM summaries
     WHERE subject_id = ?1 AND variant = ?2",
    rusqlite::params![subject_id, variant],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  let reject = |detail: String| {
    WriteOutcome::Rejected(summa_core::Error::PointerInvariantViolation {
      subject_id: w.subject_id,
      variant: w.variant.clone(),
      detail,
    })
  };

  let head = match (
    max_rev.map(revision_from_column),
    latest_rev.map(revision_from_column),
  ) {
    (Some(None), _) | (_, Some(None)) => {
      return Ok(reject(format!(
        "stored revision out of range: max {max_rev:?}, latest {latest_rev:?}"
      )));
    }
    (max_revision, latest) => LineageHead {
      max_revision: max_revision.flatten(),
      latest:       latest.flatten(),
    },
  };

  let plan: WritePlan =
    match pointer::plan_write(w.subject_id, &w.variant, &head) {
      Ok(plan) => plan,
      Err(e) => return Ok(WriteOutcome::Rejected(e)),
    };

  // Demote first: the partial unique index admits one latest row per key.
  if let Some(demote) = plan.demote {
    let changed = tx.execute(
      "UPDATE summaries SET is_latest = ?4, updated_at = ?5
       WHERE subject_id = ?1 AND variant = ?2 AND revision = ?3
         AND is_latest = 1",
      rusqlite::params![
        subject_id,
        variant,
        encode_revision(demote.revision),
        demote.is_latest,
        w.now,
      ],
    )?;
    if changed != 1 {
      return Ok(reject(format!(
        "previous head {} was not flagged latest",
        demote.revision
      )));
    }
  }

  tx.execute(
    "INSERT INTO summaries (
       subject_id, variant, revision, text, html, content_hash,
       is_latest, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    rusqlite::params![
      subject_id,
      variant,
      encode_revision(plan.revision),
      w.text,
      w.html,
      w.hash,
      plan.promote.is_latest,
      w.now,
    ],
  )?;

  let (latest_count, latest_max): (i64, Option<i64>) = tx.query_row(
    "SELECT COUNT(*), MAX(revision) FROM summaries
     WHERE subject_id = ?1 AND variant = ?2 AND is_latest = 1",
    rusqlite::params![subject_id, variant],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;
  if latest_count != 1 || latest_max != Some(encode_revision(plan.revision)) {
    return Ok(reject(format!(
      "{latest_count} latest records after writing revision {}",
      plan.revision
    )));
  }

  tx.commit()?;
  Ok(WriteOutcome::Committed(plan.revision))
}

// ─── SummaryStore impl ───────────────────────────────────────────────────────

impl SummaryStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self) -> Result<Subject> {
    self.add_subject_with_id(Uuid::new_v4()).await
  }

  async fn add_subject_with_id(&self, id: Uuid) -> Result<Subject> {
    let subject = Subject { subject_id: id, created_at: Utc::now() };

    let id_str = encode_uuid(subject.subject_id);
    let at_str = encode_dt(subject.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO subjects (subject_id, created_at) VALUES (?1, ?2)
           ON CONFLICT (subject_id) DO NOTHING",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::SubjectExists(id));
    }
    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, created_at FROM subjects
               WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawSubject {
                  subject_id: row.get(0)?,
                  created_at: row.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    // Summaries go with it through ON DELETE CASCADE.
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subjects WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted > 0 {
      tracing::info!(subject_id = %id, "deleted subject and its summaries");
    }
    Ok(deleted > 0)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn write_summary(&self, input: NewSummary) -> Result<SummaryRecord> {
    let attempts = self.options.attempts();
    let hash = input.payload.content_hash();

    for attempt in 1..=attempts {
      let now = Utc::now();
      let pending = PendingWrite {
        subject_id: input.subject_id,
        variant:    input.variant.clone(),
        text:       input.payload.text.clone(),
        html:       input.payload.html.clone(),
        hash:       hash.clone(),
        now:        encode_dt(now),
      };

      let outcome = self
        .conn
        .call(move |conn| match write_in_tx(conn, &pending) {
          Ok(outcome) => Ok(outcome),
          Err(e) if is_contention(&e) => Ok(WriteOutcome::Contended),
          Err(e) => Err(e.into()),
        })
        .await?;

      match outcome {
        WriteOutcome::Committed(revision) => {
          tracing::debug!(
            subject_id = %input.subject_id,
            variant = %input.variant,
            %revision,
            attempt,
            "summary written"
          );
          return Ok(SummaryRecord {
            subject_id: input.subject_id,
            variant: input.variant,
            revision,
            payload: input.payload,
            content_hash: hash,
            is_latest: true,
            created_at: now,
            updated_at: now,
          });
        }
        WriteOutcome::UnknownSubject => {
          return Err(Error::UnknownSubject(input.subject_id));
        }
        WriteOutcome::Rejected(e) => return Err(e.into()),
        WriteOutcome::Contended => {
          tracing::warn!(
            subject_id = %input.subject_id,
            variant = %input.variant,
            attempt,
            attempts,
            "write contended, retrying"
          );
          if attempt < attempts {
            tokio::time::sleep(self.options.backoff(attempt)).await;
          }
        }
      }
    }

    Err(
      summa_core::Error::RevisionConflict {
        subject_id: input.subject_id,
        variant: input.variant,
        attempts,
      }
      .into(),
    )
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_latest(
    &self,
    subject_id: Uuid,
    variant: Variant,
  ) -> Result<Option<SummaryRecord>> {
    let sql = format!(
      "SELECT {SUMMARY_COLUMNS} FROM summaries
       WHERE subject_id = ?1 AND variant = ?2 AND is_latest = 1"
    );
    let params = vec![
      Value::Text(encode_uuid(subject_id)),
      Value::Text(variant.into()),
    ];
    Ok(self.select_summaries(sql, params).await?.into_iter().next())
  }

  async fn get_revision(
    &self,
    subject_id: Uuid,
    variant: Variant,
    revision: Revision,
  ) -> Result<Option<SummaryRecord>> {
    let sql = format!(
      "SELECT {SUMMARY_COLUMNS} FROM summaries
       WHERE subject_id = ?1 AND variant = ?2 AND revision = ?3"
    );
    let params = vec![
      Value::Text(encode_uuid(subject_id)),
      Value::Text(variant.into()),
      Value::Integer(encode_revision(revision)),
    ];
    Ok(self.select_summaries(sql, params).await?.into_iter().next())
  }

  async fn get_history(
    &self,
    subject_id: Uuid,
    variant: Variant,
  ) -> Result<Vec<SummaryRecord>> {
    let sql = format!(
      "SELECT {SUMMARY_COLUMNS} FROM summaries
       WHERE subject_id = ?1 AND variant = ?2
       ORDER BY revision DESC"
    );
    let params = vec![
      Value::Text(encode_uuid(subject_id)),
      Value::Text(variant.into()),
    ];
    self.select_summaries(sql, params).await
  }

  async fn list_variants_latest(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<SummaryRecord>> {
    let sql = format!(
      "SELECT {SUMMARY_COLUMNS} FROM summaries
       WHERE subject_id = ?1 AND is_latest = 1
       ORDER BY variant"
    );
    self
      .select_summaries(sql, vec![Value::Text(encode_uuid(subject_id))])
      .await
  }

  async fn verify(&self, subject_id: Uuid) -> Result<()> {
    let sql = format!(
      "SELECT {SUMMARY_COLUMNS} FROM summaries
       WHERE subject_id = ?1
       ORDER BY variant, revision"
    );
    let records = self
      .select_summaries(sql, vec![Value::Text(encode_uuid(subject_id))])
      .await?;

    let mut lineages: BTreeMap<Variant, Vec<SummaryRecord>> = BTreeMap::new();
    for record in records {
      lineages.entry(record.variant.clone()).or_default().push(record);
    }
    for (variant, records) in &lineages {
      invariant::check_lineage(subject_id, variant, records)?;
    }
    Ok(())
  }
}
