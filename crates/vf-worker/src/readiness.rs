//! Startup readiness gate.
//!
//! Workers must not claim jobs until every dependency answers. Checks are
//! retried on a fixed interval; the first check to still be failing when
//! the deadline passes ends startup with [`Error::ReadinessTimeout`].

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vf_core::config::DatabaseConfig;
use vf_core::{Error, Result};
use vf_db::pool::DbPool;

use vf_av::ToolCommand;

/// One external dependency that must be reachable before work starts.
#[async_trait]
pub trait DependencyCheck: Send + Sync {
    /// Short name shown in logs and in the timeout error.
    fn name(&self) -> &str;

    /// Succeeds once the dependency is usable.
    async fn check(&self) -> Result<()>;
}

/// The job queue's database opens, migrates and answers a trivial query.
///
/// The pool is only built inside the check, so a database that cannot be
/// opened yet is retried like any other dependency. Clones share the
/// opened pool; keep one to take the pool with [`DatabaseCheck::pool`]
/// once the gate passes.
#[derive(Clone)]
pub struct DatabaseCheck {
    config: DatabaseConfig,
    pool: Arc<OnceLock<DbPool>>,
}

impl DatabaseCheck {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: Arc::new(OnceLock::new()),
        }
    }

    /// The pool opened by a passing check, if any.
    pub fn pool(&self) -> Option<DbPool> {
        self.pool.get().cloned()
    }
}

#[async_trait]
impl DependencyCheck for DatabaseCheck {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> Result<()> {
        let config = self.config.clone();
        let opened = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let pool = match opened.get() {
                Some(pool) => pool.clone(),
                None => vf_db::pool::init_pool(&config)?,
            };
            vf_db::pool::ping(&pool)?;
            let _ = opened.set(pool);
            Ok(())
        })
        .await
        .map_err(|e| Error::Internal(format!("database check panicked: {e}")))?
    }
}

/// Storage directories exist (or can be created) and accept writes.
pub struct StorageCheck {
    dirs: Vec<PathBuf>,
}

impl StorageCheck {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

#[async_trait]
impl DependencyCheck for StorageCheck {
    fn name(&self) -> &str {
        "storage"
    }

    async fn check(&self) -> Result<()> {
        for dir in &self.dirs {
            tokio::fs::create_dir_all(dir).await?;
            let probe = dir.join(".vodforge-probe");
            tokio::fs::write(&probe, b"ok").await?;
            tokio::fs::remove_file(&probe).await?;
        }
        Ok(())
    }
}

/// The encoder binary runs.
pub struct ToolCheck {
    program: PathBuf,
}

impl ToolCheck {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

#[async_trait]
impl DependencyCheck for ToolCheck {
    fn name(&self) -> &str {
        "encoder"
    }

    async fn check(&self) -> Result<()> {
        ToolCommand::new(self.program.clone())
            .arg("-version")
            .timeout(Duration::from_secs(10))
            .execute()
            .await
            .map(|_| ())
    }
}

/// Block until every check passes, retrying failed checks every `interval`.
///
/// Checks that have passed are not run again. Fails with
/// [`Error::ReadinessTimeout`] naming the checks still failing once
/// `timeout` has elapsed.
pub async fn await_ready(
    checks: &[Box<dyn DependencyCheck>],
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut pending: Vec<&dyn DependencyCheck> = checks.iter().map(|c| c.as_ref()).collect();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let outcomes = futures::future::join_all(pending.iter().map(|c| async move {
            match tokio::time::timeout_at(deadline, c.check()).await {
                Ok(res) => res,
                Err(_) => Err(Error::Internal("check did not finish before the deadline".into())),
            }
        }))
        .await;

        let mut still = Vec::new();
        for (check, outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => tracing::info!(dependency = check.name(), attempt, "Dependency ready"),
                Err(e) => {
                    tracing::warn!(dependency = check.name(), attempt, "Dependency not ready: {e}");
                    still.push(check);
                }
            }
        }
        pending = still;

        if pending.is_empty() {
            tracing::info!(waited_ms = started.elapsed().as_millis() as u64, "All dependencies ready");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::ReadinessTimeout {
                pending: pending.iter().map(|c| c.name().to_string()).collect(),
                waited: now - started,
            });
        }

        tokio::time::sleep_until((now + interval).min(deadline)).await;
    }
}
