//! Transcode job queue operations.
//!
//! Every state transition is a single conditional `UPDATE` keyed on the
//! job id and, for claimed jobs, the current lease token. SQLite serializes
//! writers, so the condition doubles as a compare-and-set: at most one
//! caller sees its update applied.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::time::Duration;
use vf_core::{Error, JobId, JobStatus, LeaseToken, Result, RetryPolicy};

use crate::models::{Lease, NewJob, TranscodeJob, JOB_COLS};

fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

fn millis_after(now: DateTime<Utc>, d: Duration) -> i64 {
    let delta = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
    now.timestamp_millis().saturating_add(delta)
}

/// Insert a new pending job.
///
/// Fails with [`Error::DuplicateJob`] when the content id already has a
/// pending or claimed job.
pub fn insert_job(conn: &Connection, job: &NewJob, now: DateTime<Utc>) -> Result<TranscodeJob> {
    if job.content_id.is_empty() {
        return Err(Error::Validation("content_id must not be empty".into()));
    }
    if job.requested_renditions.is_empty() {
        return Err(Error::Validation("a job needs at least one rendition".into()));
    }

    let id = JobId::new();
    let stamp = now.to_rfc3339();
    let renditions = serde_json::to_string(&job.requested_renditions)
        .map_err(|e| Error::Internal(format!("failed to encode renditions: {e}")))?;

    let inserted = conn.execute(
        "INSERT INTO transcode_jobs (id, content_id, source_path, renditions, status,
             available_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?6)",
        rusqlite::params![
            id.to_string(),
            job.content_id,
            job.source_path.to_string_lossy(),
            renditions,
            now.timestamp_millis(),
            stamp,
        ],
    );

    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(Error::DuplicateJob {
                content_id: job.content_id.clone(),
            });
        }
        Err(e) => return Err(db_err(e)),
    }

    get_job(conn, id)?.ok_or_else(|| Error::not_found("job", id))
}

/// Get a job by ID.
pub fn get_job(conn: &Connection, id: JobId) -> Result<Option<TranscodeJob>> {
    let q = format!("SELECT {JOB_COLS} FROM transcode_jobs WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], TranscodeJob::from_row)
        .optional()
        .map_err(db_err)
}

/// Get the most recent job for a content id.
pub fn get_latest_for_content(conn: &Connection, content_id: &str) -> Result<Option<TranscodeJob>> {
    let q = format!(
        "SELECT {JOB_COLS} FROM transcode_jobs WHERE content_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT 1"
    );
    conn.query_row(&q, [content_id], TranscodeJob::from_row)
        .optional()
        .map_err(db_err)
}

/// List jobs with optional status filter and pagination, newest first.
pub fn list_jobs(
    conn: &Connection,
    status: Option<JobStatus>,
    offset: i64,
    limit: i64,
) -> Result<Vec<TranscodeJob>> {
    let q = format!(
        "SELECT {JOB_COLS} FROM transcode_jobs
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(db_err)?;
    let rows = stmt
        .query_map(
            rusqlite::params![status.map(|s| s.as_str()), limit, offset],
            TranscodeJob::from_row,
        )
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(rows)
}

/// Number of jobs in each status.
pub fn count_by_status(conn: &Connection) -> Result<Vec<(JobStatus, i64)>> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM transcode_jobs GROUP BY status ORDER BY status")
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    rows.into_iter()
        .map(|(status, n)| Ok((status.parse()?, n)))
        .collect()
}

/// Return every claimed job whose lease has run out to the queue.
///
/// An expired lease consumes one attempt like an explicit failure, but the
/// job is claimable again immediately rather than after the backoff delay.
/// A job whose attempts are exhausted is marked failed. Returns the number
/// of jobs reaped.
pub fn reap_expired(conn: &Connection, policy: &RetryPolicy, now: DateTime<Utc>) -> Result<usize> {
    let q = format!(
        "SELECT {JOB_COLS} FROM transcode_jobs
         WHERE status = 'claimed' AND lease_expiry <= ?1"
    );
    let expired = {
        let mut stmt = conn.prepare(&q).map_err(db_err)?;
        let rows = stmt
            .query_map([now.timestamp_millis()], TranscodeJob::from_row)
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        rows
    };

    let mut reaped = 0;
    for job in expired {
        let Some(lease) = job.lease() else { continue };
        let owner = job.lease_owner.as_deref().unwrap_or("unknown");
        let reason = format!("lease held by {owner} expired");
        if release(conn, &lease, &reason, policy, Release::Expired, now)?.is_some() {
            tracing::warn!(
                job_id = %job.id,
                content_id = %job.content_id,
                owner,
                "Reaped job with expired lease"
            );
            reaped += 1;
        }
    }
    Ok(reaped)
}

/// Atomically claim the next claimable job for `worker`.
///
/// Expired leases are reaped first, inside the same immediate transaction,
/// so a job abandoned by a crashed worker is claimable even if no reaper
/// has run. Returns `Ok(None)` when nothing is available.
pub fn claim_next(
    conn: &Connection,
    worker: &str,
    lease: Duration,
    policy: &RetryPolicy,
    now: DateTime<Utc>,
) -> Result<Option<TranscodeJob>> {
    let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(db_err)?;

    reap_expired(&tx, policy, now)?;

    let token = LeaseToken::new();
    let q = format!(
        "UPDATE transcode_jobs
         SET status = 'claimed', lease_token = ?1, lease_owner = ?2, lease_expiry = ?3,
             version = version + 1, updated_at = ?4
         WHERE id = (
             SELECT id FROM transcode_jobs
             WHERE status = 'pending' AND available_at <= ?5
             ORDER BY available_at ASC, created_at ASC, rowid ASC LIMIT 1
         )
         RETURNING {JOB_COLS}"
    );
    let claimed = tx
        .query_row(
            &q,
            rusqlite::params![
                token.to_string(),
                worker,
                millis_after(now, lease),
                now.to_rfc3339(),
                now.timestamp_millis(),
            ],
            TranscodeJob::from_row,
        )
        .optional()
        .map_err(db_err)?;

    tx.commit().map_err(db_err)?;
    Ok(claimed)
}

/// Push the lease expiry of a job the caller still holds.
///
/// An expired lease is not revived. Returns `false` if the lease is no
/// longer held (expired, reaped or reclaimed).
pub fn extend_lease(
    conn: &Connection,
    lease: &Lease,
    duration: Duration,
    now: DateTime<Utc>,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE transcode_jobs SET lease_expiry = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'claimed' AND lease_token = ?4 AND lease_expiry > ?5",
            rusqlite::params![
                millis_after(now, duration),
                now.to_rfc3339(),
                lease.job_id.to_string(),
                lease.token.to_string(),
                now.timestamp_millis(),
            ],
        )
        .map_err(db_err)?;
    Ok(n > 0)
}

/// Mark a claimed job as succeeded.
///
/// Returns `true` when this call made the transition and `false` when the
/// job was already succeeded. Fails with [`Error::LeaseLost`] if the job is
/// held under a different lease or is no longer claimed.
pub fn complete_job(conn: &Connection, lease: &Lease, now: DateTime<Utc>) -> Result<bool> {
    let stamp = now.to_rfc3339();
    let n = conn
        .execute(
            "UPDATE transcode_jobs
             SET status = 'succeeded', lease_expiry = NULL, last_error = NULL,
                 version = version + 1, updated_at = ?1, completed_at = ?1
             WHERE id = ?2 AND status = 'claimed' AND lease_token = ?3",
            rusqlite::params![stamp, lease.job_id.to_string(), lease.token.to_string()],
        )
        .map_err(db_err)?;
    if n > 0 {
        return Ok(true);
    }

    match get_job(conn, lease.job_id)? {
        Some(job) if job.status == JobStatus::Succeeded => Ok(false),
        Some(_) => Err(Error::LeaseLost {
            job_id: lease.job_id.to_string(),
        }),
        None => Err(Error::not_found("job", lease.job_id)),
    }
}

/// Record a failed attempt on a claimed job.
///
/// Consumes one attempt. If the policy allows another, the job returns to
/// pending and becomes claimable after the backoff delay; otherwise it is
/// marked failed. The reason is kept in `last_error` either way.
pub fn fail_job(
    conn: &Connection,
    lease: &Lease,
    reason: &str,
    policy: &RetryPolicy,
    now: DateTime<Utc>,
) -> Result<TranscodeJob> {
    let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(db_err)?;
    let updated = release(&tx, lease, reason, policy, Release::Failed, now)?;
    tx.commit().map_err(db_err)?;

    match updated {
        Some(job) => Ok(job),
        None if get_job(conn, lease.job_id)?.is_none() => {
            Err(Error::not_found("job", lease.job_id))
        }
        None => Err(Error::LeaseLost {
            job_id: lease.job_id.to_string(),
        }),
    }
}

/// Why a claim is being given back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    /// The holder reported a failure; backoff applies.
    Failed,
    /// The lease ran out; claimable again at once, and only while still expired.
    Expired,
}

/// Shared transition for explicit failures and expired leases.
fn release(
    conn: &Connection,
    lease: &Lease,
    reason: &str,
    policy: &RetryPolicy,
    kind: Release,
    now: DateTime<Utc>,
) -> Result<Option<TranscodeJob>> {
    // Upper bound on lease_expiry; a heartbeat that lands first keeps the job.
    let expiry_bound = match kind {
        Release::Failed => i64::MAX,
        Release::Expired => now.timestamp_millis(),
    };
    let attempts: Option<u32> = conn
        .query_row(
            "SELECT attempt_count FROM transcode_jobs
             WHERE id = ?1 AND status = 'claimed' AND lease_token = ?2 AND lease_expiry <= ?3",
            rusqlite::params![lease.job_id.to_string(), lease.token.to_string(), expiry_bound],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    let Some(attempts) = attempts else {
        return Ok(None);
    };

    let attempts = attempts + 1;
    let stamp = now.to_rfc3339();
    let (status, available_at, completed_at) = if policy.allows_retry(attempts) {
        let delay = match kind {
            Release::Failed => policy.delay_for(attempts),
            Release::Expired => Duration::ZERO,
        };
        let at = millis_after(now, delay);
        (JobStatus::Pending, at, None)
    } else {
        (JobStatus::Failed, now.timestamp_millis(), Some(stamp.clone()))
    };

    let q = format!(
        "UPDATE transcode_jobs
         SET status = ?1, attempt_count = ?2, available_at = ?3, completed_at = ?4,
             last_error = ?5, lease_token = NULL, lease_owner = NULL, lease_expiry = NULL,
             version = version + 1, updated_at = ?6
         WHERE id = ?7 AND status = 'claimed' AND lease_token = ?8 AND lease_expiry <= ?9
         RETURNING {JOB_COLS}"
    );
    conn.query_row(
        &q,
        rusqlite::params![
            status.as_str(),
            attempts,
            available_at,
            completed_at,
            reason,
            stamp,
            lease.job_id.to_string(),
            lease.token.to_string(),
            expiry_bound,
        ],
        TranscodeJob::from_row,
    )
    .optional()
    .map_err(db_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use chrono::Duration as ChronoDuration;
    use vf_core::RenditionProfile;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, vec![Duration::from_secs(10), Duration::from_secs(60)])
    }

    fn new_job(content_id: &str) -> NewJob {
        NewJob::new(content_id, "/media/originals/a.mp4", RenditionProfile::default_ladder())
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn insert_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let job = insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt_count, 0);
        assert_eq!(job.requested_renditions.len(), 3);
        assert!(job.lease().is_none());

        let found = get_job(&conn, job.id).unwrap().unwrap();
        assert_eq!(found.content_id, "c1");
        assert_eq!(
            get_latest_for_content(&conn, "c1").unwrap().unwrap().id,
            job.id
        );
    }

    #[test]
    fn duplicate_live_job_is_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let err = insert_job(&conn, &new_job("c1"), t(1)).unwrap_err();
        assert!(matches!(err, Error::DuplicateJob { ref content_id } if content_id == "c1"));
    }

    #[test]
    fn terminal_job_allows_new_enqueue() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(0))
            .unwrap()
            .unwrap();
        complete_job(&conn, &claimed.lease().unwrap(), t(1)).unwrap();

        insert_job(&conn, &new_job("c1"), t(2)).unwrap();
    }

    #[test]
    fn insert_rejects_empty_renditions() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let job = NewJob::new("c1", "/a.mp4", vec![]);
        assert!(matches!(insert_job(&conn, &job, t(0)), Err(Error::Validation(_))));
    }

    #[test]
    fn claim_sets_lease_and_skips_claimed_jobs() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let job = insert_job(&conn, &new_job("c1"), t(0)).unwrap();

        let claimed = claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(0))
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Claimed);
        assert_eq!(claimed.lease_owner.as_deref(), Some("w1"));
        assert_eq!(claimed.lease_expiry, Some(t(60)));
        assert!(claimed.version > job.version);

        assert!(claim_next(&conn, "w2", Duration::from_secs(60), &policy(), t(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn claim_is_fifo() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let first = insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let _second = insert_job(&conn, &new_job("c2"), t(1)).unwrap();

        let claimed = claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(2))
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, first.id);
    }

    #[test]
    fn complete_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(0))
            .unwrap()
            .unwrap();
        let lease = claimed.lease().unwrap();

        assert!(complete_job(&conn, &lease, t(5)).unwrap());
        assert!(!complete_job(&conn, &lease, t(6)).unwrap());

        let done = get_job(&conn, lease.job_id).unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
        assert!(done.completed_at.is_some());
        assert!(done.lease_expiry.is_none());
    }

    #[test]
    fn stale_lease_cannot_complete() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let first = claim_next(&conn, "w1", Duration::from_secs(10), &policy(), t(0))
            .unwrap()
            .unwrap();

        // Lease runs out; the job is reaped and claimed by someone else.
        let second = claim_next(&conn, "w2", Duration::from_secs(10), &policy(), t(30))
            .unwrap()
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.attempt_count, 1);

        let err = complete_job(&conn, &first.lease().unwrap(), t(31)).unwrap_err();
        assert!(matches!(err, Error::LeaseLost { .. }));
        assert!(complete_job(&conn, &second.lease().unwrap(), t(32)).unwrap());
    }

    #[test]
    fn fail_requeues_with_backoff() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(0))
            .unwrap()
            .unwrap();

        let job = fail_job(&conn, &claimed.lease().unwrap(), "encoder crashed", &policy(), t(5))
            .unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt_count, 1);
        assert_eq!(job.available_at, t(15));
        assert_eq!(job.last_error.as_deref(), Some("encoder crashed"));
        assert!(job.lease_token.is_none());

        // Not claimable until the backoff elapses.
        assert!(claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(10))
            .unwrap()
            .is_none());
        assert!(claim_next(&conn, "w1", Duration::from_secs(60), &policy(), t(15))
            .unwrap()
            .is_some());
    }

    #[test]
    fn fail_exhausts_attempts() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();

        let mut now = t(0);
        let mut last = None;
        for i in 0..3 {
            let claimed = claim_next(&conn, "w1", Duration::from_secs(60), &policy(), now)
                .unwrap()
                .expect("job should be claimable");
            let reason = format!("attempt {i} failed");
            last = Some(fail_job(&conn, &claimed.lease().unwrap(), &reason, &policy(), now).unwrap());
            now += ChronoDuration::seconds(120);
        }

        let last = last.unwrap();
        assert_eq!(last.status, JobStatus::Failed);
        assert_eq!(last.attempt_count, 3);
        assert_eq!(last.last_error.as_deref(), Some("attempt 2 failed"));
        assert!(claim_next(&conn, "w1", Duration::from_secs(60), &policy(), now + ChronoDuration::days(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn reap_returns_expired_jobs_to_pending() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(10), &policy(), t(0))
            .unwrap()
            .unwrap();

        assert_eq!(reap_expired(&conn, &policy(), t(5)).unwrap(), 0);
        assert_eq!(reap_expired(&conn, &policy(), t(10)).unwrap(), 1);

        let job = get_job(&conn, claimed.id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt_count, 1);
        assert!(job.last_error.unwrap().contains("w1"));
    }

    #[test]
    fn reap_on_last_attempt_fails_job() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let single = RetryPolicy::new(1, vec![]);
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(10), &single, t(0))
            .unwrap()
            .unwrap();

        assert_eq!(reap_expired(&conn, &single, t(11)).unwrap(), 1);
        let job = get_job(&conn, claimed.id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn extend_lease_requires_current_token() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(10), &policy(), t(0))
            .unwrap()
            .unwrap();
        let lease = claimed.lease().unwrap();

        assert!(extend_lease(&conn, &lease, Duration::from_secs(10), t(8)).unwrap());
        // Extended to t(18): not yet expired at t(15).
        assert_eq!(reap_expired(&conn, &policy(), t(15)).unwrap(), 0);

        let forged = Lease {
            job_id: lease.job_id,
            token: LeaseToken::new(),
        };
        assert!(!extend_lease(&conn, &forged, Duration::from_secs(10), t(9)).unwrap());
    }

    #[test]
    fn extend_lease_does_not_revive_expired_lease() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(10), &policy(), t(0))
            .unwrap()
            .unwrap();
        let lease = claimed.lease().unwrap();

        assert!(!extend_lease(&conn, &lease, Duration::from_secs(10), t(10)).unwrap());
        assert_eq!(reap_expired(&conn, &policy(), t(11)).unwrap(), 1);
    }

    #[test]
    fn expired_release_skips_lease_extended_after_snapshot() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        let claimed = claim_next(&conn, "w1", Duration::from_secs(10), &policy(), t(0))
            .unwrap()
            .unwrap();
        let lease = claimed.lease().unwrap();

        // The reaper saw the lease as expiring at t(10); the holder
        // heartbeats before the reaper's update lands.
        assert!(extend_lease(&conn, &lease, Duration::from_secs(30), t(9)).unwrap());
        let released = release(&conn, &lease, "stale", &policy(), Release::Expired, t(10)).unwrap();
        assert!(released.is_none());

        let job = get_job(&conn, claimed.id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Claimed);
        assert_eq!(job.attempt_count, 0);
        assert!(complete_job(&conn, &lease, t(20)).unwrap());
    }

    #[test]
    fn list_and_count() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_job(&conn, &new_job("c1"), t(0)).unwrap();
        insert_job(&conn, &new_job("c2"), t(1)).unwrap();
        claim_next(&conn, "w1", Duration::from_secs(10), &policy(), t(2)).unwrap();

        assert_eq!(list_jobs(&conn, None, 0, 10).unwrap().len(), 2);
        let pending = list_jobs(&conn, Some(JobStatus::Pending), 0, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content_id, "c2");

        let counts = count_by_status(&conn).unwrap();
        assert!(counts.contains(&(JobStatus::Claimed, 1)));
        assert!(counts.contains(&(JobStatus::Pending, 1)));
    }
}
