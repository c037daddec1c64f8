//! SQL schema for the Waymark SQLite store.
//!
//! The schema version lives in `PRAGMA user_version`. Each [`Migration`] is
//! applied in its own transaction, in order, starting after the version found
//! on disk. A fresh database walks the whole chain.

use std::time::Duration;

/// One step of the schema history.
pub struct Migration {
  pub version:     i64,
  pub description: &'static str,
  pub sql:         &'static str,
}

/// Initial layout. Sites carried page metadata that was never surfaced.
const V1_INITIAL: &str = "
CREATE TABLE IF NOT EXISTS sites (
    site_id     TEXT PRIMARY KEY,
    url         TEXT NOT NULL UNIQUE,   -- normalised absolute URL
    visit_count INTEGER NOT NULL DEFAULT 0,
    last_visit  INTEGER NOT NULL,       -- unix epoch milliseconds
    title       TEXT,
    description TEXT,
    image_url   TEXT,
    icon_hash   TEXT                    -- favicons(hash); not enforced
);

-- Visits are append-only; rows leave only through the retention operations.
CREATE TABLE IF NOT EXISTS visits (
    visit_id   TEXT PRIMARY KEY,
    site_id    TEXT NOT NULL REFERENCES sites(site_id),
    timestamp  INTEGER NOT NULL,        -- unix epoch milliseconds
    visit_type TEXT NOT NULL DEFAULT 'link',
    root_id    INTEGER NOT NULL DEFAULT 0
);

-- Content-addressed icon bytes.
CREATE TABLE IF NOT EXISTS favicons (
    hash       TEXT PRIMARY KEY,        -- hex SHA-256 of data
    media_type TEXT NOT NULL,
    width      INTEGER NOT NULL,
    height     INTEGER NOT NULL,
    data       BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS domains (
    domain_id     TEXT PRIMARY KEY,
    domain        TEXT NOT NULL UNIQUE, -- registered domain, lower case
    provider_name TEXT,
    icon_hash     TEXT
);

CREATE INDEX IF NOT EXISTS visits_site_idx      ON visits(site_id);
CREATE INDEX IF NOT EXISTS visits_timestamp_idx ON visits(timestamp);
CREATE INDEX IF NOT EXISTS sites_last_visit_idx ON sites(last_visit);
";

/// Drop the unused page metadata columns.
const V2_DROP_PAGE_METADATA: &str = "
ALTER TABLE sites DROP COLUMN description;
ALTER TABLE sites DROP COLUMN image_url;
";

/// Two-phase deletion of visits.
const V3_MARKED_FOR_DELETION: &str = "
ALTER TABLE visits ADD COLUMN marked_for_deletion INTEGER NOT NULL DEFAULT 0;
CREATE INDEX IF NOT EXISTS visits_marked_idx ON visits(marked_for_deletion);
";

pub const MIGRATIONS: &[Migration] = &[
  Migration {
    version:     1,
    description: "initial schema",
    sql:         V1_INITIAL,
  },
  Migration {
    version:     2,
    description: "drop unused site page metadata",
    sql:         V2_DROP_PAGE_METADATA,
  },
  Migration {
    version:     3,
    description: "add visits.marked_for_deletion",
    sql:         V3_MARKED_FOR_DELETION,
  },
];

/// The version a fully migrated database reports.
pub const LATEST_VERSION: i64 = 3;

/// How long a writer waits on a lock held by another connection.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection settings, applied on every open.
pub fn configure(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
  conn.pragma_update(None, "foreign_keys", true)?;
  conn.busy_timeout(BUSY_TIMEOUT)?;
  Ok(())
}

pub fn user_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
  conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply a single migration and record its version atomically.
pub fn apply(conn: &mut rusqlite::Connection, migration: &Migration) -> rusqlite::Result<()> {
  let tx = conn.transaction()?;
  tx.execute_batch(migration.sql)?;
  tx.pragma_update(None, "user_version", migration.version)?;
  tx.commit()
}
