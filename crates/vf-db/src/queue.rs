//! The job queue service used by the ingestion side and the workers.
//!
//! [`JobQueue`] owns the connection pool and the [`RetryPolicy`] and stamps
//! every transition with the current time. Correctness does not depend on
//! how many queues, pools or processes share the database: every mutation
//! is a conditional update in [`crate::queries::transcode_jobs`].

use std::time::Duration;

use chrono::Utc;
use vf_core::{JobId, JobStatus, Result, RetryPolicy};

use crate::models::{Lease, NewJob, TranscodeJob};
use crate::pool::{get_conn, DbPool};
use crate::queries::transcode_jobs as q;

/// Durable, at-least-once transcode job queue.
#[derive(Clone)]
pub struct JobQueue {
    pool: DbPool,
    policy: RetryPolicy,
}

impl JobQueue {
    pub fn new(pool: DbPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Add a pending job. Fails with `DuplicateJob` if the content already
    /// has a pending or claimed job.
    pub fn enqueue(&self, job: NewJob) -> Result<TranscodeJob> {
        let conn = get_conn(&self.pool)?;
        let job = q::insert_job(&conn, &job, Utc::now())?;
        tracing::info!(job_id = %job.id, content_id = %job.content_id, "Enqueued transcode job");
        Ok(job)
    }

    /// Claim the next available job for `worker` with a lease of `lease`.
    ///
    /// `Ok(None)` means no job is available right now.
    pub fn claim(&self, worker: &str, lease: Duration) -> Result<Option<TranscodeJob>> {
        let conn = get_conn(&self.pool)?;
        let job = q::claim_next(&conn, worker, lease, &self.policy, Utc::now())?;
        if let Some(ref job) = job {
            tracing::debug!(
                job_id = %job.id,
                content_id = %job.content_id,
                attempt = job.attempt_count + 1,
                worker,
                "Claimed job"
            );
        }
        Ok(job)
    }

    /// Mark the leased job succeeded. Repeated calls after success are no-ops.
    pub fn complete(&self, lease: &Lease) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        if q::complete_job(&conn, lease, Utc::now())? {
            tracing::info!(job_id = %lease.job_id, "Job succeeded");
        }
        Ok(())
    }

    /// Record a failed attempt; returns the job's new state (pending for a
    /// retry, failed once the attempts are exhausted).
    pub fn fail(&self, lease: &Lease, reason: &str) -> Result<TranscodeJob> {
        let conn = get_conn(&self.pool)?;
        let job = q::fail_job(&conn, lease, reason, &self.policy, Utc::now())?;
        match job.status {
            JobStatus::Failed => tracing::error!(
                job_id = %job.id,
                content_id = %job.content_id,
                attempts = job.attempt_count,
                reason,
                "Job failed permanently"
            ),
            _ => tracing::warn!(
                job_id = %job.id,
                content_id = %job.content_id,
                attempts = job.attempt_count,
                retry_at = %job.available_at,
                reason,
                "Job attempt failed; requeued"
            ),
        }
        Ok(job)
    }

    /// Record a failure that no retry can fix; the job goes straight to
    /// Failed regardless of attempts left.
    pub fn fail_terminal(&self, lease: &Lease, reason: &str) -> Result<TranscodeJob> {
        let conn = get_conn(&self.pool)?;
        let job = q::fail_job(&conn, lease, reason, &RetryPolicy::new(1, Vec::new()), Utc::now())?;
        tracing::error!(
            job_id = %job.id,
            content_id = %job.content_id,
            attempts = job.attempt_count,
            reason,
            "Job failed permanently (not retryable)"
        );
        Ok(job)
    }

    /// Extend a lease the caller still holds. `Ok(false)` means it was lost.
    pub fn heartbeat(&self, lease: &Lease, duration: Duration) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        q::extend_lease(&conn, lease, duration, Utc::now())
    }

    /// Return abandoned (lease-expired) jobs to the queue.
    pub fn reap_expired(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        q::reap_expired(&conn, &self.policy, Utc::now())
    }

    pub fn get(&self, id: JobId) -> Result<Option<TranscodeJob>> {
        let conn = get_conn(&self.pool)?;
        q::get_job(&conn, id)
    }

    pub fn get_by_content(&self, content_id: &str) -> Result<Option<TranscodeJob>> {
        let conn = get_conn(&self.pool)?;
        q::get_latest_for_content(&conn, content_id)
    }

    pub fn list(&self, status: Option<JobStatus>, limit: i64) -> Result<Vec<TranscodeJob>> {
        let conn = get_conn(&self.pool)?;
        q::list_jobs(&conn, status, 0, limit)
    }

    pub fn counts(&self) -> Result<Vec<(JobStatus, i64)>> {
        let conn = get_conn(&self.pool)?;
        q::count_by_status(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{init_memory_pool, init_pool_at};
    use std::sync::{Arc, Barrier};
    use vf_core::{Error, RenditionProfile};

    fn job(content_id: &str) -> NewJob {
        NewJob::new(content_id, "/m/a.mp4", vec![RenditionProfile::new("720p", 1280, 720, 2500, 0)])
    }

    #[test]
    fn enqueue_claim_complete() {
        let queue = JobQueue::new(init_memory_pool().unwrap(), RetryPolicy::default());
        let enq = queue.enqueue(job("c1")).unwrap();

        let claimed = queue.claim("w1", Duration::from_secs(30)).unwrap().unwrap();
        assert_eq!(claimed.id, enq.id);
        let lease = claimed.lease().unwrap();

        queue.complete(&lease).unwrap();
        queue.complete(&lease).unwrap();
        assert_eq!(queue.get(enq.id).unwrap().unwrap().status, JobStatus::Succeeded);
        assert!(queue.claim("w1", Duration::from_secs(30)).unwrap().is_none());
    }

    #[test]
    fn duplicate_enqueue_fails() {
        let queue = JobQueue::new(init_memory_pool().unwrap(), RetryPolicy::default());
        queue.enqueue(job("c1")).unwrap();
        assert!(matches!(queue.enqueue(job("c1")), Err(Error::DuplicateJob { .. })));
    }

    #[test]
    fn fail_max_attempts_times_is_terminal() {
        let policy = RetryPolicy::new(3, vec![]);
        let queue = JobQueue::new(init_memory_pool().unwrap(), policy);
        let enq = queue.enqueue(job("c1")).unwrap();

        for _ in 0..3 {
            let claimed = queue.claim("w1", Duration::from_secs(30)).unwrap().unwrap();
            queue.fail(&claimed.lease().unwrap(), "no renditions").unwrap();
        }

        let failed = queue.get(enq.id).unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("no renditions"));
        assert!(queue.claim("w1", Duration::from_secs(30)).unwrap().is_none());
    }

    #[test]
    fn terminal_failure_skips_remaining_attempts() {
        let queue = JobQueue::new(init_memory_pool().unwrap(), RetryPolicy::new(5, vec![]));
        let enq = queue.enqueue(job("c1")).unwrap();
        let claimed = queue.claim("w1", Duration::from_secs(30)).unwrap().unwrap();

        let failed = queue.fail_terminal(&claimed.lease().unwrap(), "bad content id").unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.attempt_count, 1);
        assert_eq!(queue.get(enq.id).unwrap().unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn expired_lease_is_reclaimable_after_reap() {
        let queue = JobQueue::new(init_memory_pool().unwrap(), RetryPolicy::default());
        queue.enqueue(job("c1")).unwrap();
        let first = queue.claim("w1", Duration::from_millis(1)).unwrap().unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(queue.reap_expired().unwrap(), 1);
        let second = queue.claim("w2", Duration::from_secs(30)).unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_ne!(second.lease_token, first.lease_token);

        // The crashed worker's late heartbeat is refused.
        assert!(!queue.heartbeat(&first.lease().unwrap(), Duration::from_secs(30)).unwrap());
        assert!(queue.heartbeat(&second.lease().unwrap(), Duration::from_secs(30)).unwrap());
    }

    #[test]
    fn concurrent_claims_never_share_a_job() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool_at(&dir.path().join("queue.db")).unwrap();
        let queue = JobQueue::new(pool, RetryPolicy::default());
        queue.enqueue(job("only")).unwrap();

        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let queue = queue.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    queue
                        .claim(&format!("w{i}"), Duration::from_secs(30))
                        .unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(winners, 1);
    }
}
