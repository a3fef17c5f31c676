//! SQL schema for the Rapport SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Identity records are owned by the identity provider; only display fields
-- are kept here.
CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,   -- lowercase, trimmed
    first_name  TEXT,
    middle_name TEXT,
    last_name   TEXT,
    avatar      TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

-- Bearer tokens, stored as SHA-256 hex digests only.
CREATE TABLE IF NOT EXISTS credentials (
    token_digest TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    created_at   TEXT NOT NULL
);

-- Notes are owned by the note service; read here for ownership and titles.
CREATE TABLE IF NOT EXISTS notes (
    note_id    TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL REFERENCES users(user_id),
    title      TEXT NOT NULL,
    content    TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One row per directed pair: `other_id` is in `owner_id`'s friends, incoming
-- or outgoing set. The primary key makes the three sets disjoint per
-- counterpart. Rows are always written in mirrored pairs inside one
-- transaction.
CREATE TABLE IF NOT EXISTS relations (
    owner_id   TEXT NOT NULL REFERENCES users(user_id),
    other_id   TEXT NOT NULL REFERENCES users(user_id),
    kind       TEXT NOT NULL,   -- 'friends' | 'incoming' | 'outgoing'
    since      TEXT NOT NULL,
    PRIMARY KEY (owner_id, other_id),
    CHECK (owner_id != other_id),
    CHECK (kind IN ('friends', 'incoming', 'outgoing'))
);

-- Messages are append-only; only `read` is ever updated, and only 0 -> 1.
CREATE TABLE IF NOT EXISTS messages (
    message_id   TEXT PRIMARY KEY,
    sender_id    TEXT NOT NULL REFERENCES users(user_id),
    recipient_id TEXT NOT NULL REFERENCES users(user_id),
    text         TEXT NOT NULL,
    read         INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id    TEXT PRIMARY KEY,
    note_id       TEXT NOT NULL REFERENCES notes(note_id),
    author_id     TEXT NOT NULL REFERENCES users(user_id),
    text          TEXT NOT NULL,
    read_by_owner INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS relations_kind_idx     ON relations(owner_id, kind);
CREATE INDEX IF NOT EXISTS messages_recipient_idx ON messages(recipient_id, read);
CREATE INDEX IF NOT EXISTS messages_pair_idx      ON messages(sender_id, recipient_id);
CREATE INDEX IF NOT EXISTS comments_note_idx      ON comments(note_id, read_by_owner);
CREATE INDEX IF NOT EXISTS notes_owner_idx        ON notes(owner_id);

PRAGMA user_version = 1;
";
