//! Process wiring: config loading, queue and worker construction, and the
//! worker's startup sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use vf_av::{FfmpegTranscoder, ToolRegistry, Transcoder};
use vf_core::config::Config;
use vf_core::{Error, Result};
use vf_db::JobQueue;
use vf_worker::{
    await_ready, ArtifactStore, DatabaseCheck, DependencyCheck, LocalArtifactStore, StorageCheck,
    ToolCheck, WorkerContext, WorkerPool,
};

/// Load the config file (if any), apply `VODFORGE_*` overrides and reject
/// configurations that cannot run.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env_overrides()?;
    config.check()?;
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }
    Ok(config)
}

/// Open the job database and wrap it in a queue with the configured
/// retry policy.
pub fn open_queue(config: &Config) -> Result<JobQueue> {
    tracing::debug!(path = %config.database.path.display(), "Opening job database");
    let pool = vf_db::pool::init_pool(&config.database)?;
    Ok(JobQueue::new(pool, config.retry_policy()))
}

/// Encoder path: discovered or configured, else the bare name so the
/// readiness gate reports it missing.
pub fn resolve_ffmpeg(config: &Config) -> PathBuf {
    let tools = ToolRegistry::discover(&config.tools);
    tools
        .require(vf_av::tools::FFMPEG)
        .map(|t| t.path.clone())
        .unwrap_or_else(|_| {
            config
                .tools
                .ffmpeg_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(vf_av::tools::FFMPEG))
        })
}

/// The dependencies a worker waits for before claiming jobs.
///
/// `database` is shared with the returned list; once the gate passes it
/// holds the opened pool.
pub fn readiness_checks(
    config: &Config,
    database: &DatabaseCheck,
    ffmpeg: &Path,
) -> Vec<Box<dyn DependencyCheck>> {
    vec![
        Box::new(database.clone()),
        Box::new(StorageCheck::new(vec![
            config.storage.originals_dir(),
            config.storage.staging_dir(),
            config.storage.public_dir(),
        ])),
        Box::new(ToolCheck::new(ffmpeg.to_path_buf())),
    ]
}

/// Build the shared worker context around the real encoder and local store.
pub fn worker_context(config: Config, queue: JobQueue, ffmpeg: PathBuf) -> WorkerContext {
    let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::new(
        config.storage.public_dir(),
        config.storage.staging_dir(),
    ));
    let transcoder: Arc<dyn Transcoder> =
        Arc::new(FfmpegTranscoder::new(ffmpeg, config.worker.encoder_timeout()));
    WorkerContext::new(config, queue, store, transcoder)
}

/// Gate on dependencies, then either drain the queue once or run the pool
/// until `cancel` fires.
pub async fn run_worker(config: Config, once: bool, cancel: CancellationToken) -> Result<()> {
    let ffmpeg = resolve_ffmpeg(&config);
    let database = DatabaseCheck::new(config.database.clone());

    let checks = readiness_checks(&config, &database, &ffmpeg);
    await_ready(&checks, config.readiness.interval(), config.readiness.timeout()).await?;

    let pool = database
        .pool()
        .ok_or_else(|| Error::Internal("database passed readiness without a pool".into()))?;
    let queue = JobQueue::new(pool, config.retry_policy());

    let pool = WorkerPool::new(worker_context(config, queue, ffmpeg));

    if once {
        let worker_id = format!("worker-{}-once", std::process::id());
        let mut processed = 0usize;
        while !cancel.is_cancelled() {
            match pool.run_once(&worker_id).await? {
                Some(outcome) => {
                    processed += 1;
                    tracing::info!(?outcome, "Job settled");
                }
                None => break,
            }
        }
        tracing::info!(processed, "Queue drained");
        return Ok(());
    }

    pool.run(cancel).await;
    Ok(())
}
