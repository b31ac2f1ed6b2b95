//! Worker pool: claim loops, heartbeats, reaping and per-job orchestration.
//!
//! Each worker loop claims one job at a time. A claimed job's renditions
//! are encoded concurrently (bounded by `rendition_parallelism`), the
//! successful ones are assembled into a manifest and published, and only
//! then is the job acknowledged. Shutdown stops the claim loops; a job
//! already in progress runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use vf_av::JobWorkspace;
use vf_core::config::PartialPolicy;
use vf_core::{Error, JobStatus, RenditionResult, Result};
use vf_db::{JobQueue, Lease, TranscodeJob};

use crate::context::WorkerContext;
use crate::store::{StagedFile, THUMBNAIL_FILE};

/// How one claimed job ended for this worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Published and acknowledged.
    Succeeded {
        /// Labels that made it into the manifest, in listing order.
        published: Vec<String>,
        /// Labels that failed and were left out.
        skipped: Vec<String>,
    },
    /// The attempt failed and the job is queued again.
    Retrying { reason: String },
    /// The attempt failed and no attempts remain.
    Failed { reason: String },
    /// The lease was lost to another worker; nothing was acknowledged.
    Abandoned { reason: String },
}

/// A set of worker loops sharing one [`WorkerContext`].
pub struct WorkerPool {
    ctx: WorkerContext,
}

impl WorkerPool {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Run `worker.count` claim loops plus the maintenance task until
    /// `cancel` fires and every loop has returned.
    pub async fn run(&self, cancel: CancellationToken) {
        let count = self.ctx.config.worker.count.max(1);
        let mut tasks = JoinSet::new();

        for i in 0..count {
            let name = format!("worker-{}-{i}", std::process::id());
            tasks.spawn(worker_loop(self.ctx.clone(), name, cancel.clone()));
        }
        tasks.spawn(maintenance_loop(self.ctx.clone(), cancel.clone()));

        tracing::info!(workers = count, "Worker pool started");

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                tracing::error!("Worker task panicked: {e}");
            }
        }

        tracing::info!("Worker pool stopped");
    }

    /// Claim and process at most one job. `Ok(None)` means the queue had
    /// nothing available.
    pub async fn run_once(&self, worker_id: &str) -> Result<Option<JobOutcome>> {
        let lease = self.ctx.config.queue.lease();
        let Some(job) = self.ctx.queue.claim(worker_id, lease)? else {
            return Ok(None);
        };
        Ok(Some(process_job(&self.ctx, worker_id, job).await))
    }
}

/// One claim loop. Polls with exponential idle backoff between
/// `poll_interval` and `max_idle_backoff`.
async fn worker_loop(ctx: WorkerContext, worker_id: String, cancel: CancellationToken) {
    let base = ctx.config.worker.poll_interval();
    let ceiling = ctx.config.worker.max_idle_backoff();
    let lease = ctx.config.queue.lease();
    let mut idle = base;

    tracing::info!(worker = %worker_id, "Worker started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match ctx.queue.claim(&worker_id, lease) {
            Ok(Some(job)) => {
                idle = base;
                let outcome = process_job(&ctx, &worker_id, job).await;
                tracing::debug!(worker = %worker_id, ?outcome, "Job finished");
                continue;
            }
            Ok(None) => {}
            Err(e) => tracing::error!(worker = %worker_id, "Claim failed: {e}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(idle) => {}
            _ = cancel.cancelled() => break,
        }
        idle = (idle * 2).min(ceiling);
    }

    tracing::info!(worker = %worker_id, "Worker stopped");
}

/// Periodically returns expired leases to the queue and sweeps stale
/// staging output.
async fn maintenance_loop(ctx: WorkerContext, cancel: CancellationToken) {
    let every = ctx.config.worker.reap_interval();
    let max_age = Duration::from_secs(ctx.config.storage.staging_max_age_secs);

    loop {
        match ctx.queue.reap_expired() {
            Ok(0) => {}
            Ok(n) => tracing::warn!(jobs = n, "Requeued jobs with expired leases"),
            Err(e) => tracing::error!("Reap failed: {e}"),
        }
        match ctx.store.sweep(max_age).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(entries = n, "Swept stale staging output"),
            Err(e) => tracing::warn!("Staging sweep failed: {e}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(every) => {}
            _ = cancel.cancelled() => break,
        }
    }
}

/// Run a claimed job to a settled state.
///
/// Never returns an error: every failure is recorded against the job (or,
/// if the lease is gone, left for whichever worker now holds it).
pub async fn process_job(ctx: &WorkerContext, worker_id: &str, job: TranscodeJob) -> JobOutcome {
    let Some(lease) = job.lease() else {
        return JobOutcome::Abandoned {
            reason: format!("job {} is not leased", job.id),
        };
    };

    tracing::info!(
        job_id = %job.id,
        content_id = %job.content_id,
        attempt = job.attempt_count + 1,
        worker = worker_id,
        renditions = job.requested_renditions.len(),
        "Processing job"
    );

    let lost = Arc::new(AtomicBool::new(false));
    let stop = CancellationToken::new();
    let heartbeat = spawn_heartbeat(
        ctx.queue.clone(),
        lease,
        ctx.config.queue.lease(),
        stop.clone(),
        lost.clone(),
    );

    let result = execute(ctx, &job, &lease, &lost).await;

    stop.cancel();
    let _ = heartbeat.await;

    match result {
        Ok(outcome) => outcome,
        Err(e) => settle_failure(&ctx.queue, &job, &lease, e),
    }
}

async fn execute(
    ctx: &WorkerContext,
    job: &TranscodeJob,
    lease: &Lease,
    lost: &AtomicBool,
) -> Result<JobOutcome> {
    let workspace = JobWorkspace::create(&ctx.config.storage.staging_dir(), &job.id.to_string())?;

    let results = encode_all(ctx, job, &workspace).await;

    let skipped: Vec<&RenditionResult> = results.iter().filter(|r| !r.is_ok()).collect();
    for r in &skipped {
        tracing::warn!(
            job_id = %job.id,
            rendition = %r.profile.label,
            reason = r.failure_reason().unwrap_or_default(),
            "Rendition excluded"
        );
    }

    if skipped.len() == results.len() {
        let reasons: Vec<String> = skipped
            .iter()
            .map(|r| format!("{}: {}", r.profile.label, r.failure_reason().unwrap_or_default()))
            .collect();
        return Err(Error::Assembly(format!(
            "all renditions failed ({})",
            reasons.join("; ")
        )));
    }

    if ctx.config.worker.partial_policy == PartialPolicy::Strict {
        if let Some(r) = skipped.first() {
            return Err(Error::encode(
                &r.profile.label,
                r.failure_reason().unwrap_or_default(),
            ));
        }
    }

    let manifest = vf_media::assemble(&job.content_id, &results)?;

    let mut extra = Vec::new();
    if ctx.config.worker.thumbnails {
        let thumb = workspace.file(THUMBNAIL_FILE);
        match ctx.transcoder.thumbnail(&job.source_path, &thumb).await {
            Ok(()) => extra.push(StagedFile::new(thumb, THUMBNAIL_FILE)),
            Err(e) => tracing::warn!(job_id = %job.id, "Thumbnail skipped: {e}"),
        }
    }

    // Publishing under a lost lease would race the new holder.
    if lost.load(Ordering::SeqCst) || !ctx.queue.heartbeat(lease, ctx.config.queue.lease())? {
        return Ok(JobOutcome::Abandoned {
            reason: "lease lost before publish".into(),
        });
    }

    ctx.store.publish(&job.content_id, &manifest, &extra).await?;

    match ctx.queue.complete(lease) {
        Ok(()) => {}
        Err(Error::LeaseLost { .. }) => {
            tracing::warn!(job_id = %job.id, "Lease lost after publish; leaving acknowledgement to the new holder");
            return Ok(JobOutcome::Abandoned {
                reason: "lease lost after publish".into(),
            });
        }
        Err(e) => return Err(e),
    }

    if let Err(e) = workspace.close() {
        tracing::debug!(job_id = %job.id, "Staging cleanup failed: {e}");
    }

    Ok(JobOutcome::Succeeded {
        published: manifest.labels().into_iter().map(String::from).collect(),
        skipped: skipped.iter().map(|r| r.profile.label.clone()).collect(),
    })
}

/// Encode every requested rendition, at most `rendition_parallelism` at a
/// time. Results come back in request order.
async fn encode_all(
    ctx: &WorkerContext,
    job: &TranscodeJob,
    workspace: &JobWorkspace,
) -> Vec<RenditionResult> {
    let permits = Semaphore::new(ctx.config.worker.rendition_parallelism.max(1));
    let permits = &permits;

    let encodes = job.requested_renditions.iter().map(|profile| async move {
        let _permit = permits.acquire().await;
        ctx.transcoder
            .transcode(&job.source_path, profile, workspace.path())
            .await
    });

    futures::future::join_all(encodes).await
}

fn settle_failure(queue: &JobQueue, job: &TranscodeJob, lease: &Lease, err: Error) -> JobOutcome {
    let reason = err.to_string();

    if matches!(err, Error::LeaseLost { .. }) {
        return JobOutcome::Abandoned { reason };
    }

    let recorded = if err.is_retryable() {
        queue.fail(lease, &reason)
    } else {
        queue.fail_terminal(lease, &reason)
    };

    match recorded {
        Ok(updated) if updated.status == JobStatus::Failed => JobOutcome::Failed { reason },
        Ok(_) => JobOutcome::Retrying { reason },
        Err(e) => {
            tracing::error!(job_id = %job.id, "Could not record failure: {e}");
            JobOutcome::Abandoned {
                reason: format!("{reason}; recording failed: {e}"),
            }
        }
    }
}

/// Keep extending the lease every third of its length until `stop` fires
/// or the lease is found to be lost.
fn spawn_heartbeat(
    queue: JobQueue,
    lease: Lease,
    length: Duration,
    stop: CancellationToken,
    lost: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let every = (length / 3).max(Duration::from_millis(50));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(every) => {}
                _ = stop.cancelled() => break,
            }
            match queue.heartbeat(&lease, length) {
                Ok(true) => tracing::trace!(job_id = %lease.job_id, "Lease extended"),
                Ok(false) => {
                    tracing::warn!(job_id = %lease.job_id, "Lease lost");
                    lost.store(true, Ordering::SeqCst);
                    break;
                }
                Err(e) => tracing::warn!(job_id = %lease.job_id, "Heartbeat failed: {e}"),
            }
        }
    })
}
