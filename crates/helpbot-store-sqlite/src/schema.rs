//! SQL schema for the helpbot SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY
);

-- One row per help thread. Rows are never deleted.
CREATE TABLE IF NOT EXISTS threads (
    thread_id            TEXT PRIMARY KEY,       -- platform snowflake
    thread_controller_id TEXT NOT NULL UNIQUE,   -- bot status message
    title                TEXT NOT NULL,
    author_id            TEXT NOT NULL,
    collection           TEXT NOT NULL,
    open                 INTEGER NOT NULL DEFAULT 1,
    solved               INTEGER NOT NULL DEFAULT 0,
    solved_votes         INTEGER NOT NULL DEFAULT 0,
    failed_votes         INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

-- Messages are append-only; a claim flips `processed` and bumps `updated_at`.
CREATE TABLE IF NOT EXISTS messages (
    message_id    TEXT PRIMARY KEY,
    thread_id     TEXT NOT NULL REFERENCES threads(thread_id),
    content       TEXT NOT NULL,
    sources       TEXT,
    from_bot      INTEGER NOT NULL,
    first_message INTEGER NOT NULL,
    mentions_bot  INTEGER NOT NULL,
    processed     INTEGER NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS messages_pending_idx ON messages(from_bot, processed);
CREATE INDEX IF NOT EXISTS messages_thread_idx  ON messages(thread_id);
CREATE INDEX IF NOT EXISTS threads_created_idx  ON threads(created_at);

PRAGMA user_version = 1;
";
