//! Shared helpers for integration tests.
//!
//! Provides [`TestEnv`], a temporary media root plus job database, and a
//! shell-script stand-in for ffmpeg that writes real HLS output.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use vf_core::config::Config;
use vf_core::RetryPolicy;
use vf_db::JobQueue;

/// A throwaway media root and database.
pub struct TestEnv {
    pub root: tempfile::TempDir,
    pub config: Config,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.database.path = root.path().join("jobs.db");
        config.storage.media_root = root.path().join("media");
        config.worker.poll_interval_ms = 10;
        config.worker.max_idle_backoff_ms = 50;
        config.queue.backoff_secs = vec![0];
        Self { root, config }
    }

    /// Queue over this environment's database with the given policy.
    pub fn queue_with(&self, policy: RetryPolicy) -> JobQueue {
        let pool = vf_db::pool::init_pool(&self.config.database).expect("failed to open db");
        JobQueue::new(pool, policy)
    }

    pub fn queue(&self) -> JobQueue {
        self.queue_with(self.config.retry_policy())
    }

    /// Write a small fake original and return its path.
    pub fn upload(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, b"not really a video").expect("failed to write upload");
        path
    }

    pub fn public_dir(&self) -> PathBuf {
        self.config.storage.public_dir()
    }

    pub fn db_path(&self) -> &Path {
        &self.config.database.path
    }

    pub fn media_root(&self) -> &Path {
        &self.config.storage.media_root
    }
}

/// Lease long enough that nothing expires mid-test.
pub const LEASE: Duration = Duration::from_secs(30);

/// Install an executable fake ffmpeg in `dir`.
///
/// `-version` prints a banner. An output path ending in `.m3u8` gets a
/// playlist and three segments, unless its directory name contains one of
/// `fail_labels`, in which case the script exits 1. Any other output path
/// is treated as a thumbnail.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, fail_labels: &[&str]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let mut script = String::from(
        "#!/bin/sh\n\
         if [ \"$1\" = \"-version\" ]; then echo 'ffmpeg version 6.1-fake'; exit 0; fi\n\
         for last; do :; done\n\
         out=$(dirname \"$last\")\n",
    );
    for label in fail_labels {
        script.push_str(&format!(
            "case \"$out\" in */{label}) echo 'Conversion failed!' >&2; exit 1;; esac\n"
        ));
    }
    script.push_str(
        "case \"$last\" in *.m3u8) ;; *) printf 'jpeg' > \"$last\"; exit 0;; esac\n\
         printf '#EXTM3U\\n#EXT-X-VERSION:3\\n#EXT-X-TARGETDURATION:6\\n#EXT-X-MEDIA-SEQUENCE:0\\n' > \"$last\"\n\
         for i in 000 001 002; do\n\
           printf 'segment' > \"$out/$i.ts\"\n\
           printf '#EXTINF:6.000000,\\n%s.ts\\n' \"$i\" >> \"$last\"\n\
         done\n\
         printf '#EXT-X-ENDLIST\\n' >> \"$last\"\n",
    );

    let path = dir.join("ffmpeg");
    std::fs::write(&path, script).expect("failed to write fake ffmpeg");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod fake ffmpeg");
    path
}
