//! Schema and additive migrations for the on-device journal database.
//!
//! Collections are created additively: each schema version adds tables that
//! earlier versions did not have and never rewrites existing data. The
//! current version is tracked with `PRAGMA user_version`, but every open
//! also replays the full `IF NOT EXISTS` schema so a skipped or partially
//! applied upgrade self-heals on the next start.

/// Current schema version. Bump when a migration step is appended.
pub const SCHEMA_VERSION: i64 = 2;

/// Per-version migration steps. `MIGRATION_STEPS[n]` upgrades a database
/// from version `n` to version `n + 1`.
pub const MIGRATION_STEPS: &[&str] = &[
    // Version 1: photo entries
    r#"
    CREATE TABLE IF NOT EXISTS photos (
        id TEXT PRIMARY KEY,
        captured_at TEXT NOT NULL,
        mime TEXT NOT NULL,
        image BLOB NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_photos_captured_at ON photos(captured_at);
    "#,
    // Version 2: per-day notes (added after photos shipped)
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        day TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
];

/// The complete current schema. Everything is `IF NOT EXISTS` so it can be
/// replayed on every open regardless of what `user_version` claims.
pub const SCHEMA: &str = r#"
-- Photos: one row per captured or imported photo, image bytes inline
CREATE TABLE IF NOT EXISTS photos (
    id TEXT PRIMARY KEY,
    captured_at TEXT NOT NULL,       -- RFC 3339, UTC
    mime TEXT NOT NULL,              -- image/jpeg for captures
    image BLOB NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_photos_captured_at ON photos(captured_at);

-- Notes: at most one free-text note per local calendar day
CREATE TABLE IF NOT EXISTS notes (
    day TEXT PRIMARY KEY,            -- YYYY-MM-DD, local calendar day
    text TEXT NOT NULL,
    updated_at TEXT NOT NULL         -- RFC 3339, UTC
);
"#;
