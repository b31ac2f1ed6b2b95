//! Artifact storage and atomic publication.
//!
//! A title is published as one directory, `<public>/<content_id>/`. The full
//! file set is first assembled in a hidden sibling (`.incoming-*`) by
//! hard-linking (or copying) staged files and writing the playlists, then
//! moved into place with a single directory rename. Readers therefore see
//! either the previous complete set or the new complete set. Hidden entries
//! under the public root are never part of a published title.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::Serialize;
use vf_core::{Error, Result};
use vf_media::Manifest;

/// File name of the poster frame inside a published title.
pub const THUMBNAIL_FILE: &str = "thumbnail.jpg";

const INCOMING_PREFIX: &str = ".incoming-";
const RETIRED_PREFIX: &str = ".retired-";

/// A file produced during a job, to be carried into the published set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Where the file currently lives (inside the staging area).
    pub source: PathBuf,
    /// Destination relative to the title's public directory.
    pub dest: PathBuf,
}

impl StagedFile {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

/// Summary of a completed publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedTitle {
    pub content_id: String,
    pub path: PathBuf,
    /// Number of files in the published set.
    pub files: usize,
    /// Whether an earlier published set was replaced.
    pub replaced: bool,
}

/// Storage for originals and published artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Publish the manifest's playlists, its segment files and any `extra`
    /// staged files as the complete artifact set for `content_id`.
    ///
    /// Either every file becomes visible or none does. Staged sources are
    /// left untouched.
    async fn publish(
        &self,
        content_id: &str,
        manifest: &Manifest,
        extra: &[StagedFile],
    ) -> Result<PublishedTitle>;

    /// Read a file relative to the public root.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Atomically replace a file relative to the public root.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Whether a complete artifact set exists for `content_id`.
    async fn is_published(&self, content_id: &str) -> Result<bool>;

    /// Remove staging directories and interrupted publish leftovers older
    /// than `max_age`. Returns how many entries were removed.
    async fn sweep(&self, max_age: Duration) -> Result<usize>;
}

/// [`ArtifactStore`] on a local (or locally mounted) filesystem.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    public_root: PathBuf,
    staging_root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(public_root: impl Into<PathBuf>, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
            staging_root: staging_root.into(),
        }
    }

    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Public directory of a title.
    pub fn title_dir(&self, content_id: &str) -> PathBuf {
        self.public_root.join(content_id)
    }

    fn resolve(&self, rel: &Path) -> Result<PathBuf> {
        check_relative(rel)?;
        Ok(self.public_root.join(rel))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn publish(
        &self,
        content_id: &str,
        manifest: &Manifest,
        extra: &[StagedFile],
    ) -> Result<PublishedTitle> {
        check_content_id(content_id)?;
        if manifest.content_id != content_id {
            return Err(Error::publish(
                content_id,
                format!("manifest belongs to '{}'", manifest.content_id),
            ));
        }

        let mut files: Vec<StagedFile> = manifest
            .segment_files()
            .into_iter()
            .map(|(source, dest)| StagedFile { source, dest })
            .collect();
        files.extend_from_slice(extra);
        let documents = manifest.documents();

        let public_root = self.public_root.clone();
        let id = content_id.to_string();
        let published = tokio::task::spawn_blocking(move || {
            publish_blocking(&public_root, &id, &files, &documents)
        })
        .await
        .map_err(|e| Error::publish(content_id, format!("publish task panicked: {e}")))??;

        tracing::info!(
            content_id,
            files = published.files,
            replaced = published.replaced,
            path = %published.path.display(),
            "Published artifact set"
        );
        Ok(published)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::read(full).await?)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&full, &bytes))
            .await
            .map_err(|e| Error::Internal(format!("write task panicked: {e}")))?
    }

    async fn is_published(&self, content_id: &str) -> Result<bool> {
        check_content_id(content_id)?;
        let master = self.title_dir(content_id).join(vf_media::MASTER_PLAYLIST);
        Ok(tokio::fs::try_exists(master).await?)
    }

    async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let staging = self.staging_root.clone();
        let public = self.public_root.clone();
        tokio::task::spawn_blocking(move || {
            let mut removed = sweep_dir(&staging, max_age, |_| true)?;
            removed += sweep_dir(&public, max_age, |name| {
                name.starts_with(INCOMING_PREFIX) || name.starts_with(RETIRED_PREFIX)
            })?;
            Ok(removed)
        })
        .await
        .map_err(|e| Error::Internal(format!("sweep task panicked: {e}")))?
    }
}

fn publish_blocking(
    public_root: &Path,
    content_id: &str,
    files: &[StagedFile],
    documents: &[(PathBuf, String)],
) -> Result<PublishedTitle> {
    let fail = |what: String| Error::publish(content_id, what);

    std::fs::create_dir_all(public_root)
        .map_err(|e| fail(format!("create {}: {e}", public_root.display())))?;

    // Removed on drop unless renamed into place first.
    let incoming = tempfile::Builder::new()
        .prefix(&format!("{INCOMING_PREFIX}{content_id}-"))
        .tempdir_in(public_root)
        .map_err(|e| fail(format!("create incoming dir: {e}")))?;

    for file in files {
        check_relative(&file.dest)?;
        let dest = incoming.path().join(&file.dest);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| fail(format!("create {}: {e}", parent.display())))?;
        }
        link_or_copy(&file.source, &dest)
            .map_err(|e| fail(format!("stage {}: {e}", file.source.display())))?;
    }

    for (rel, body) in documents {
        check_relative(rel)?;
        let dest = incoming.path().join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| fail(format!("create {}: {e}", parent.display())))?;
        }
        std::fs::write(&dest, body).map_err(|e| fail(format!("write {}: {e}", rel.display())))?;
    }

    let target = public_root.join(content_id);
    let replaced = target.exists();
    let retired = public_root.join(format!(
        "{RETIRED_PREFIX}{content_id}-{}",
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ));

    if replaced {
        std::fs::rename(&target, &retired)
            .map_err(|e| fail(format!("retire previous set: {e}")))?;
    }

    if let Err(e) = std::fs::rename(incoming.path(), &target) {
        if replaced {
            if let Err(restore) = std::fs::rename(&retired, &target) {
                tracing::error!(
                    content_id,
                    retired = %retired.display(),
                    "Could not restore previous artifact set: {restore}"
                );
            }
        }
        return Err(fail(format!("move into place: {e}")));
    }

    if replaced {
        if let Err(e) = std::fs::remove_dir_all(&retired) {
            tracing::warn!(content_id, "Could not remove retired set: {e}");
        }
    }

    Ok(PublishedTitle {
        content_id: content_id.to_string(),
        path: target,
        files: files.len() + documents.len(),
        replaced,
    })
}

fn link_or_copy(src: &Path, dest: &Path) -> std::io::Result<()> {
    match std::fs::hard_link(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => std::fs::copy(src, dest).map(|_| ()),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let parent = path
        .parent()
        .ok_or_else(|| Error::Validation(format!("no parent for {}", path.display())))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::from(e.error))?;
    Ok(())
}

fn sweep_dir(dir: &Path, max_age: Duration, select: impl Fn(&str) -> bool) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !select(&name) {
            continue;
        }
        let meta = entry.metadata()?;
        let age = newest_mtime(&entry.path())
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        let res = if meta.is_dir() {
            std::fs::remove_dir_all(entry.path())
        } else {
            std::fs::remove_file(entry.path())
        };
        match res {
            Ok(()) => {
                tracing::info!(path = %entry.path().display(), "Swept stale entry");
                removed += 1;
            }
            Err(e) => tracing::warn!(path = %entry.path().display(), "Sweep failed: {e}"),
        }
    }
    Ok(removed)
}

/// Latest modification time anywhere under `path`, itself included.
///
/// An encoder writing into `<workspace>/<label>/` leaves the workspace
/// directory's own mtime untouched, so the whole tree is consulted.
fn newest_mtime(path: &Path) -> Option<SystemTime> {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .max()
}

fn check_content_id(content_id: &str) -> Result<()> {
    let ok = !content_id.is_empty()
        && !content_id.starts_with('.')
        && content_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid content id '{content_id}'")))
    }
}

fn check_relative(path: &Path) -> Result<()> {
    let ok = path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "path must be relative without '..': {}",
            path.display()
        )))
    }
}
