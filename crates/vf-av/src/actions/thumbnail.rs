//! Poster-frame extraction.

use std::path::Path;
use std::time::Duration;

use crate::command::ToolCommand;

/// Seek position of the poster frame.
pub const THUMBNAIL_OFFSET: &str = "00:00:03";
pub const THUMBNAIL_WIDTH: u32 = 320;
pub const THUMBNAIL_HEIGHT: u32 = 180;

/// Grab one scaled frame from `source` into `dest` (JPEG by extension).
///
/// The frame is written next to `dest` first and renamed into place, so a
/// failed run never leaves a truncated image at `dest`.
pub async fn extract_thumbnail(
    ffmpeg: &Path,
    timeout: Option<Duration>,
    source: &Path,
    dest: &Path,
) -> vf_core::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = dest.with_extension("partial.jpg");

    let result = ToolCommand::new(ffmpeg.to_path_buf())
        .args(["-y", "-i"])
        .arg(source.to_string_lossy())
        .args(["-ss", THUMBNAIL_OFFSET, "-vframes", "1", "-vf"])
        .arg(format!("scale={THUMBNAIL_WIDTH}:{THUMBNAIL_HEIGHT}"))
        .arg(partial.to_string_lossy())
        .maybe_timeout(timeout)
        .execute()
        .await;

    match result {
        Ok(_) => {
            tokio::fs::rename(&partial, dest).await?;
            tracing::debug!(dest = %dest.display(), "Thumbnail extracted");
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}
