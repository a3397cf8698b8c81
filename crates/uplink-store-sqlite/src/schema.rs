//! SQL schema for the Uplink SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per analysis run; never updated.
CREATE TABLE IF NOT EXISTS score_records (
    record_id     TEXT PRIMARY KEY,
    idea_id       INTEGER NOT NULL,
    sub_scores    TEXT NOT NULL,   -- JSON object, one number per criterion
    overall_score REAL NOT NULL,
    evaluated_at  TEXT NOT NULL    -- ISO 8601 UTC
);

-- Journey timeline; strictly append-only.
CREATE TABLE IF NOT EXISTS journey_events (
    idea_id     INTEGER NOT NULL,
    seq         INTEGER NOT NULL,   -- 1-based, gap-free per idea
    kind        TEXT NOT NULL,
    recorded_at TEXT NOT NULL,      -- ISO 8601 UTC; store-assigned
    payload     TEXT,               -- JSON JourneyPayload or NULL
    PRIMARY KEY (idea_id, seq)
);

CREATE INDEX IF NOT EXISTS score_records_idea_idx ON score_records(idea_id);

PRAGMA user_version = 1;
";
