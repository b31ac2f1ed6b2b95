//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the database, storage layout, queue, workers, readiness
//! gate, tools, and the rendition ladder. Every section defaults sensibly so
//! a completely empty `{}` file is valid. Connection parameters can be
//! overridden from the environment after the file is loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::media::RenditionProfile;
use crate::retry::RetryPolicy;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub readiness: ReadinessConfig,
    pub tools: ToolsConfig,
    pub renditions: Vec<RenditionProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
            worker: WorkerConfig::default(),
            readiness: ReadinessConfig::default(),
            tools: ToolsConfig::default(),
            renditions: RenditionProfile::default_ladder(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist. A file that exists but
    /// cannot be parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `VODFORGE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VODFORGE_DB_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("VODFORGE_MEDIA_ROOT") {
            self.storage.media_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("VODFORGE_FFMPEG") {
            self.tools.ffmpeg_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("VODFORGE_WORKERS") {
            self.worker.count = parse_env("VODFORGE_WORKERS", &v)?;
        }
        if let Some(v) = lookup("VODFORGE_LEASE_SECS") {
            self.queue.lease_secs = parse_env("VODFORGE_LEASE_SECS", &v)?;
        }
        if let Some(v) = lookup("VODFORGE_MAX_ATTEMPTS") {
            self.queue.max_attempts = parse_env("VODFORGE_MAX_ATTEMPTS", &v)?;
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn check(&self) -> Result<()> {
        if self.renditions.is_empty() {
            return Err(Error::Validation("at least one rendition is required".into()));
        }
        let mut seen = HashSet::new();
        for r in &self.renditions {
            if r.label.is_empty() || r.label.contains(['/', '\\']) || r.label.starts_with('.') {
                return Err(Error::Validation(format!(
                    "rendition label '{}' is not a valid directory name",
                    r.label
                )));
            }
            if !seen.insert(r.label.as_str()) {
                return Err(Error::Validation(format!("duplicate rendition label '{}'", r.label)));
            }
            if r.video_kbps == 0 {
                return Err(Error::Validation(format!("rendition '{}' has zero bitrate", r.label)));
            }
            if r.segment_duration == 0 {
                return Err(Error::Validation(format!(
                    "rendition '{}' has zero segment duration",
                    r.label
                )));
            }
            if r.width == 0 || r.height == 0 {
                return Err(Error::Validation(format!(
                    "rendition '{}' has an empty resolution",
                    r.label
                )));
            }
        }
        if self.queue.max_attempts == 0 {
            return Err(Error::Validation("queue.max_attempts must be at least 1".into()));
        }
        if self.queue.lease_secs == 0 {
            return Err(Error::Validation("queue.lease_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.check() {
            warnings.push(e.to_string());
        }

        if self.worker.count == 0 {
            warnings.push("worker.count is 0; the pool will not claim any jobs".into());
        }

        let encoder_timeout = self.worker.encoder_timeout_secs;
        if encoder_timeout > 0 && self.storage.staging_max_age_secs < encoder_timeout {
            warnings.push(format!(
                "storage.staging_max_age_secs ({}) is shorter than worker.encoder_timeout_secs ({}); \
                 the sweep may remove a running job's workspace",
                self.storage.staging_max_age_secs, encoder_timeout
            ));
        }

        if self.readiness.timeout_secs == 0 {
            warnings.push("readiness.timeout_secs is 0; startup checks get a single try".into());
        }

        if self.queue.backoff_secs.is_empty() {
            warnings.push("queue.backoff_secs is empty; failed jobs are retried immediately".into());
        }

        warnings
    }

    /// The queue's retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.queue.max_attempts,
            self.queue
                .backoff_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        )
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("{key}: cannot parse '{value}'")))
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// SQLite database backing the job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub pool_size: u32,
    /// How long a connection waits on a locked database before erroring.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/vodforge.db"),
            pool_size: 4,
            busy_timeout_ms: 5000,
        }
    }
}

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub media_root: PathBuf,
    /// Staging directories older than this are swept by the maintenance task.
    pub staging_max_age_secs: u64,
    /// Largest accepted source file, if limited.
    pub max_source_bytes: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("./data/media"),
            staging_max_age_secs: 24 * 3600,
            max_source_bytes: None,
        }
    }
}

impl StorageConfig {
    /// Where ingested originals live.
    pub fn originals_dir(&self) -> PathBuf {
        self.media_root.join("originals")
    }

    /// Where workers stage in-progress output.
    pub fn staging_dir(&self) -> PathBuf {
        self.media_root.join("staging")
    }

    /// Where published artifact sets become visible.
    pub fn public_dir(&self) -> PathBuf {
        self.media_root.join("public")
    }
}

/// Job queue leasing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub lease_secs: u64,
    pub max_attempts: u32,
    /// Delay before each retry, indexed by attempts consumed; last entry repeats.
    pub backoff_secs: Vec<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lease_secs: 300,
            max_attempts: 3,
            backoff_secs: vec![30, 120, 600],
        }
    }
}

impl QueueConfig {
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

/// What to do with a job where some renditions failed and some succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialPolicy {
    /// Publish what succeeded.
    #[default]
    Degrade,
    /// Fail the attempt unless every rendition succeeded.
    Strict,
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    pub poll_interval_ms: u64,
    /// Upper bound for the idle poll backoff.
    pub max_idle_backoff_ms: u64,
    /// Renditions of one job encoded at the same time.
    pub rendition_parallelism: usize,
    pub partial_policy: PartialPolicy,
    /// Hard limit on one encoder invocation; 0 disables the limit.
    pub encoder_timeout_secs: u64,
    pub reap_interval_secs: u64,
    pub thumbnails: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            poll_interval_ms: 500,
            max_idle_backoff_ms: 10_000,
            rendition_parallelism: 2,
            partial_policy: PartialPolicy::Degrade,
            encoder_timeout_secs: 7200,
            reap_interval_secs: 30,
            thumbnails: true,
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_idle_backoff(&self) -> Duration {
        Duration::from_millis(self.max_idle_backoff_ms.max(self.poll_interval_ms))
    }

    pub fn encoder_timeout(&self) -> Option<Duration> {
        (self.encoder_timeout_secs > 0).then(|| Duration::from_secs(self.encoder_timeout_secs))
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

/// Startup dependency gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_secs: 60,
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}
