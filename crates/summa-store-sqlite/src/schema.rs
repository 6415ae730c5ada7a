//! SQL schema for the Summa SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL
);

-- One row per revision. Only is_latest (and updated_at) ever change, and
-- only from 1 to 0; a row is promoted exactly once, at insert.
CREATE TABLE IF NOT EXISTS summaries (
    subject_id    TEXT NOT NULL
                  REFERENCES subjects(subject_id) ON DELETE CASCADE,
    variant       TEXT NOT NULL,
    revision      INTEGER NOT NULL CHECK (revision >= 1),
    text          TEXT NOT NULL,
    html          TEXT,
    content_hash  TEXT NOT NULL,   -- SHA-256 hex of the payload
    is_latest     INTEGER NOT NULL DEFAULT 0 CHECK (is_latest IN (0, 1)),
    created_at    TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at    TEXT NOT NULL,
    PRIMARY KEY (subject_id, variant, revision)
) WITHOUT ROWID;

-- At most one latest row per key; also the latest-only access path.
CREATE UNIQUE INDEX IF NOT EXISTS summaries_latest_idx
    ON summaries(subject_id, variant) WHERE is_latest = 1;

-- Guards only: neither trigger writes, so neither can fire another.
CREATE TRIGGER IF NOT EXISTS summaries_immutable
BEFORE UPDATE OF subject_id, variant, revision, text, html, content_hash,
                 created_at
ON summaries
BEGIN
    SELECT RAISE(ABORT, 'summary records are immutable');
END;

CREATE TRIGGER IF NOT EXISTS summaries_no_late_promotion
BEFORE UPDATE OF is_latest ON summaries
WHEN NEW.is_latest = 1 AND OLD.is_latest = 0
BEGIN
    SELECT RAISE(ABORT, 'a summary becomes latest only when it is written');
END;

PRAGMA user_version = 1;
";
