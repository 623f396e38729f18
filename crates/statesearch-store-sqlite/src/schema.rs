//! SQL schema for the statesearch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per declaration per corpus revision. The id is the join key with
-- the payload of the revision's vector-store points.
CREATE TABLE IF NOT EXISTS theorems (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    args        TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    goal        TEXT NOT NULL,
    module      TEXT NOT NULL,
    rev         TEXT NOT NULL,
    formal_type TEXT
);

-- Updated in place only through the explicit feedback-update path.
CREATE TABLE IF NOT EXISTS feedback (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    query       TEXT    NOT NULL,
    theorem_id  INTEGER NOT NULL,
    relevant    INTEGER NOT NULL,             -- 0 | 1
    rank        INTEGER NOT NULL,
    recorded_at TEXT    NOT NULL              -- ISO 8601 UTC; server-assigned
);

-- Append-only.
CREATE TABLE IF NOT EXISTS clicks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    query       TEXT    NOT NULL,
    theorem_id  INTEGER NOT NULL,
    rank        INTEGER NOT NULL,
    recorded_at TEXT    NOT NULL
);

-- Append-only.
CREATE TABLE IF NOT EXISTS calls (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    call_type   TEXT NOT NULL,
    query       TEXT NOT NULL DEFAULT '',
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS theorems_rev_idx        ON theorems(rev);
CREATE INDEX IF NOT EXISTS feedback_query_theorem  ON feedback(query, theorem_id);

PRAGMA user_version = 1;
";
