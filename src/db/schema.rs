//! SQL DDL for initializing the profile storage.
//! SQLite-first design; statements are split on `;` so none may contain one.

/// SQLite schema with:
/// - `principals`: known owners, referenced by every profile
/// - `user_connections`: one row per profile, `ON DELETE CASCADE` from its owner
/// - column CHECKs mirroring the record validation limits
/// - timestamps as fixed-width RFC3339 UTC text, so lexical order is time order
/// - indexes by owner and by `created_at` descending
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS principals (
    id TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_connections (
    id TEXT PRIMARY KEY NOT NULL,
    owner_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
    kind TEXT NOT NULL CHECK (length(kind) BETWEEN 1 AND 50),
    host TEXT NOT NULL CHECK (length(host) BETWEEN 1 AND 255),
    port TEXT NOT NULL CHECK (length(port) BETWEEN 1 AND 10),
    database_name TEXT NOT NULL CHECK (length(database_name) BETWEEN 1 AND 255),
    username TEXT NOT NULL CHECK (length(username) BETWEEN 1 AND 255),
    encrypted_secret TEXT NOT NULL CHECK (length(encrypted_secret) > 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL CHECK (updated_at >= created_at)
);

CREATE INDEX IF NOT EXISTS idx_user_connections_owner_id ON user_connections(owner_id);

CREATE INDEX IF NOT EXISTS idx_user_connections_created_at ON user_connections(created_at DESC)
"#;
