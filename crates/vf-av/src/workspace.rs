//! Per-attempt staging directories.
//!
//! A [`JobWorkspace`] is a private directory under the staging root that
//! holds every file a job attempt produces before publication. Nothing in
//! it is ever visible to playback clients. The directory is removed when
//! the workspace is dropped; directories left behind by crashed workers
//! are removed by the staging sweep.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Staging area for one attempt at one job.
///
/// # Example
///
/// ```no_run
/// use vf_av::JobWorkspace;
///
/// let ws = JobWorkspace::create(std::path::Path::new("/srv/media/staging"), "job-1").unwrap();
/// // ... encode renditions under `ws.path()`, publish ...
/// drop(ws); // staging removed
/// ```
#[derive(Debug)]
pub struct JobWorkspace {
    temp_dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh staging directory named `<prefix>-<random>` under
    /// `staging_root`, creating the root if needed.
    pub fn create(staging_root: &Path, prefix: &str) -> vf_core::Result<Self> {
        std::fs::create_dir_all(staging_root)?;
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(staging_root)
            .map_err(|e| vf_core::Error::Tool {
                tool: "workspace".to_string(),
                message: format!("failed to create staging dir: {e}"),
            })?;

        Ok(Self { temp_dir })
    }

    /// Root of this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named file at the workspace root.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Remove the workspace now, reporting any failure.
    pub fn close(self) -> vf_core::Result<()> {
        self.temp_dir.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn workspace_lives_under_staging_root() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("staging");
        let ws = JobWorkspace::create(&staging, "job-42").unwrap();

        assert!(ws.path().starts_with(&staging));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("job-42-"));
    }

    #[test]
    fn drop_removes_staged_files() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), "job").unwrap();
        let dir = ws.path().join("480p");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("000.ts"), b"seg").unwrap();

        let path = ws.path().to_path_buf();
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn two_attempts_get_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = JobWorkspace::create(root.path(), "job").unwrap();
        let b = JobWorkspace::create(root.path(), "job").unwrap();
        assert_ne!(a.path(), b.path());
        a.close().unwrap();
        b.close().unwrap();
    }
}
