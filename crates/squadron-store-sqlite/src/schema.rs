//! SQL schema for the Squadron SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- `id` is the external source's id, never generated here.
CREATE TABLE IF NOT EXISTS characters (
    id                   INTEGER PRIMARY KEY,
    name                 TEXT NOT NULL UNIQUE,
    height               REAL,
    mass                 REAL,
    gender               TEXT,
    homeworld            TEXT,
    species              TEXT,
    image_url            TEXT,
    affiliations         TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    biography            TEXT,
    is_evil              INTEGER NOT NULL DEFAULT 0,
    evilness_score       INTEGER CHECK (evilness_score BETWEEN 0 AND 100),
    evilness_explanation TEXT,
    embedding            BLOB,                        -- little-endian f32s
    is_deleted           INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

-- Replaced by set difference on every sync; rows are deleted physically.
CREATE TABLE IF NOT EXISTS masters (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    character_id INTEGER NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
    master_name  TEXT NOT NULL,
    is_deleted   INTEGER NOT NULL DEFAULT 0,
    UNIQUE (character_id, master_name)
);

CREATE TABLE IF NOT EXISTS teams (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE,
    owner      INTEGER,                               -- external user id
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id      INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    character_id INTEGER NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
    is_deleted   INTEGER NOT NULL DEFAULT 0,
    joined_at    TEXT NOT NULL,
    UNIQUE (team_id, character_id)
);

CREATE INDEX IF NOT EXISTS characters_deleted_idx ON characters(is_deleted);
CREATE INDEX IF NOT EXISTS masters_character_idx  ON masters(character_id);
CREATE INDEX IF NOT EXISTS teams_deleted_idx      ON teams(is_deleted);
CREATE INDEX IF NOT EXISTS team_members_team_idx  ON team_members(team_id);

PRAGMA user_version = 1;
";
