//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use vf_core::{Error, Result};

/// V1: the transcode job table.
///
/// Timestamps used for lease and backoff comparisons are stored as Unix
/// milliseconds so ordering is numeric; human-facing timestamps are RFC 3339.
const V1_INITIAL: &str = r#"
CREATE TABLE transcode_jobs (
    id            TEXT PRIMARY KEY,
    content_id    TEXT NOT NULL,
    source_path   TEXT NOT NULL,
    renditions    TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'pending',
    attempt_count INTEGER NOT NULL DEFAULT 0,
    version       INTEGER NOT NULL DEFAULT 0,
    lease_token   TEXT,
    lease_owner   TEXT,
    lease_expiry  INTEGER,
    available_at  INTEGER NOT NULL,
    last_error    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    completed_at  TEXT
);

-- At most one live (pending or claimed) job per content id.
CREATE UNIQUE INDEX idx_transcode_jobs_live_content
    ON transcode_jobs(content_id) WHERE status IN ('pending', 'claimed');

CREATE INDEX idx_transcode_jobs_claimable
    ON transcode_jobs(status, available_at, created_at);

CREATE INDEX idx_transcode_jobs_lease
    ON transcode_jobs(status, lease_expiry);
"#;

/// Ordered list of (version, SQL) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL)];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit()
            .map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(version, "Applied migration");
    }

    Ok(())
}
