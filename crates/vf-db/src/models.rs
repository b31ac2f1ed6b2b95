//! Rust structs mapping to database tables.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;
use vf_core::{JobId, JobStatus, LeaseToken, RenditionProfile};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_opt_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| Uuid::parse_str(&v).map(T::from).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn parse_millis(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let ms: Option<i64> = row.get(idx)?;
    Ok(ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
}

// ---------------------------------------------------------------------------
// TranscodeJob
// ---------------------------------------------------------------------------

/// Column list matching [`TranscodeJob::from_row`].
pub(crate) const JOB_COLS: &str = "id, content_id, source_path, renditions, status, attempt_count,
    version, lease_token, lease_owner, lease_expiry, available_at, last_error,
    created_at, updated_at, completed_at";

/// A row of the `transcode_jobs` table.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub id: JobId,
    pub content_id: String,
    pub source_path: PathBuf,
    pub requested_renditions: Vec<RenditionProfile>,
    pub status: JobStatus,
    pub attempt_count: u32,
    /// Bumped on every state transition.
    pub version: i64,
    pub lease_token: Option<LeaseToken>,
    pub lease_owner: Option<String>,
    pub lease_expiry: Option<DateTime<Utc>>,
    /// Earliest time a pending job may be claimed.
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl TranscodeJob {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let renditions: String = row.get(3)?;
        let status: String = row.get(4)?;
        let source: String = row.get(2)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            content_id: row.get(1)?,
            source_path: PathBuf::from(source),
            requested_renditions: serde_json::from_str(&renditions)
                .map_err(|e| conversion_err(3, e))?,
            status: status.parse().map_err(|e| conversion_err(4, e))?,
            attempt_count: row.get(5)?,
            version: row.get(6)?,
            lease_token: parse_opt_id(row, 7)?,
            lease_owner: row.get(8)?,
            lease_expiry: parse_millis(row, 9)?,
            available_at: parse_millis(row, 10)?.unwrap_or_default(),
            last_error: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            completed_at: row.get(14)?,
        })
    }

    /// The lease held on this job, if it is currently claimed.
    pub fn lease(&self) -> Option<Lease> {
        match (self.status, self.lease_token) {
            (JobStatus::Claimed, Some(token)) => Some(Lease {
                job_id: self.id,
                token,
            }),
            _ => None,
        }
    }
}

/// Proof of a claim: the job plus the fencing token stamped by `claim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub job_id: JobId,
    pub token: LeaseToken,
}

/// A job as submitted by the ingestion side.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub content_id: String,
    pub source_path: PathBuf,
    pub requested_renditions: Vec<RenditionProfile>,
}

impl NewJob {
    pub fn new(
        content_id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        requested_renditions: Vec<RenditionProfile>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            source_path: source_path.into(),
            requested_renditions,
        }
    }
}
