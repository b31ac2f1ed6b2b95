//! Enqueue-side checks for uploaded originals.
//!
//! Uploads must be one of the accepted video containers and stay under the
//! configured size limit. Accepted originals can be copied into the media
//! root so the worker never reads from the uploader's path.

use std::path::{Path, PathBuf};

use vf_core::config::Config;
use vf_core::{Error, RenditionProfile, Result};
use vf_db::{JobQueue, NewJob, TranscodeJob};

/// Container extensions accepted for transcoding (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Check that `source` is an accepted, readable video file and return its
/// size in bytes.
pub fn validate_source(source: &Path, max_bytes: Option<u64>) -> Result<u64> {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::Validation(format!(
            "unsupported file type '{}'; expected one of {}",
            source.display(),
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let meta = std::fs::metadata(source).map_err(|e| {
        Error::Validation(format!("cannot read source {}: {e}", source.display()))
    })?;
    if !meta.is_file() {
        return Err(Error::Validation(format!("{} is not a file", source.display())));
    }
    if meta.len() == 0 {
        return Err(Error::Validation(format!("{} is empty", source.display())));
    }
    if let Some(limit) = max_bytes {
        if meta.len() > limit {
            return Err(Error::Validation(format!(
                "{} is {} bytes; the limit is {limit}",
                source.display(),
                meta.len()
            )));
        }
    }
    Ok(meta.len())
}

/// Pick the requested profiles out of the configured ladder, by label.
/// An empty request selects the whole ladder.
pub fn select_renditions(ladder: &[RenditionProfile], labels: &[String]) -> Result<Vec<RenditionProfile>> {
    if labels.is_empty() {
        return Ok(ladder.to_vec());
    }
    labels
        .iter()
        .map(|label| {
            ladder
                .iter()
                .find(|p| &p.label == label)
                .cloned()
                .ok_or_else(|| Error::Validation(format!("unknown rendition '{label}'")))
        })
        .collect()
}

/// Copy an original into `<originals>/<content_id>.<ext>`.
pub fn store_original(originals_dir: &Path, content_id: &str, source: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(originals_dir)?;
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let dest = originals_dir.join(format!("{content_id}.{ext}"));
    std::fs::copy(source, &dest)?;
    Ok(dest)
}

/// Validate and enqueue one upload.
pub fn enqueue_upload(
    queue: &JobQueue,
    config: &Config,
    content_id: &str,
    source: &Path,
    labels: &[String],
    copy_original: bool,
) -> Result<TranscodeJob> {
    validate_content_id(content_id)?;
    let size = validate_source(source, config.storage.max_source_bytes)?;
    let renditions = select_renditions(&config.renditions, labels)?;

    // Checked before copying so a running job's original is never overwritten.
    if let Some(existing) = queue.get_by_content(content_id)? {
        if !existing.status.is_terminal() {
            return Err(Error::DuplicateJob {
                content_id: content_id.to_string(),
            });
        }
    }

    let source_path = if copy_original {
        store_original(&config.storage.originals_dir(), content_id, source)?
    } else {
        std::fs::canonicalize(source)?
    };

    tracing::debug!(content_id, size, source = %source_path.display(), "Upload accepted");
    queue.enqueue(NewJob::new(content_id, source_path, renditions))
}

/// Content ids become directory names under the public root.
pub fn validate_content_id(content_id: &str) -> Result<()> {
    let ok = !content_id.is_empty()
        && content_id.len() <= 128
        && !content_id.starts_with('.')
        && content_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid content id '{content_id}'; use letters, digits, '-', '_' or '.'"
        )))
    }
}
