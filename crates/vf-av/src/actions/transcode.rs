//! One-rendition HLS transcode.
//!
//! The encoder writes into `<staging>/<label>/` only. Its own playlist is
//! then read back and checked against the segment files on disk before the
//! rendition is reported as usable. Every failure is folded into a
//! [`RenditionResult`] so one bad rendition never aborts its siblings.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use vf_core::{RenditionProfile, RenditionResult, SegmentInfo};
use vf_media::hls::{check_contiguous, parse_media_playlist};
use vf_media::RENDITION_PLAYLIST;

use crate::command::ToolCommand;

/// Segment file name pattern handed to the encoder.
pub const SEGMENT_PATTERN: &str = "%03d.ts";

/// Encoder arguments for producing `profile` from `source` into `out_dir`.
pub fn hls_args(source: &Path, profile: &RenditionProfile, out_dir: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-c:v".into(),
        "libx264".into(),
        "-c:a".into(),
        "aac".into(),
        "-vf".into(),
        format!("scale={}:{}", profile.width, profile.height),
        "-b:v".into(),
        format!("{}k", profile.video_kbps),
        "-b:a".into(),
        format!("{}k", profile.audio_kbps),
        "-hls_time".into(),
        profile.segment_duration.to_string(),
        "-hls_list_size".into(),
        "0".into(),
        "-hls_segment_filename".into(),
        out_dir.join(SEGMENT_PATTERN).to_string_lossy().into_owned(),
        "-f".into(),
        "hls".into(),
        out_dir.join(RENDITION_PLAYLIST).to_string_lossy().into_owned(),
    ]
}

/// Run the encoder for one rendition and validate what it produced.
///
/// Never returns an error: spawn failures, timeouts, non-zero exits and
/// invalid output all become [`RenditionResult::failed`], and the partial
/// output directory is removed.
pub async fn transcode_rendition(
    ffmpeg: &Path,
    timeout: Option<Duration>,
    source: &Path,
    profile: &RenditionProfile,
    staging_dir: &Path,
) -> RenditionResult {
    let out_dir = staging_dir.join(&profile.label);
    let started = Instant::now();

    match run(ffmpeg, timeout, source, profile, &out_dir).await {
        Ok((playlist_path, segments)) => {
            tracing::info!(
                rendition = %profile.label,
                segments = segments.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Rendition encoded"
            );
            RenditionResult::ok(profile.clone(), out_dir, playlist_path, segments)
        }
        Err(reason) => {
            tracing::warn!(rendition = %profile.label, %reason, "Rendition failed");
            if let Err(e) = tokio::fs::remove_dir_all(&out_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(dir = %out_dir.display(), "Could not remove failed output: {e}");
                }
            }
            RenditionResult::failed(profile.clone(), out_dir, reason)
        }
    }
}

async fn run(
    ffmpeg: &Path,
    timeout: Option<Duration>,
    source: &Path,
    profile: &RenditionProfile,
    out_dir: &Path,
) -> Result<(PathBuf, Vec<SegmentInfo>), String> {
    if !tokio::fs::try_exists(source).await.unwrap_or(false) {
        return Err(format!("source not found: {}", source.display()));
    }

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;

    tracing::debug!(
        rendition = %profile.label,
        source = %source.display(),
        out = %out_dir.display(),
        "Starting encoder"
    );

    ToolCommand::new(ffmpeg.to_path_buf())
        .args(hls_args(source, profile, out_dir))
        .maybe_timeout(timeout)
        .execute()
        .await
        .map_err(|e| e.to_string())?;

    let playlist_path = out_dir.join(RENDITION_PLAYLIST);
    let segments = collect_segments(&playlist_path, out_dir).await?;
    Ok((playlist_path, segments))
}

/// Read the encoder's playlist and confirm every listed segment exists,
/// is non-empty and that the run is contiguous.
async fn collect_segments(playlist_path: &Path, out_dir: &Path) -> Result<Vec<SegmentInfo>, String> {
    let text = tokio::fs::read_to_string(playlist_path)
        .await
        .map_err(|e| format!("encoder playlist unreadable: {e}"))?;
    let playlist = parse_media_playlist(&text).map_err(|e| e.to_string())?;

    let mut segments = Vec::with_capacity(playlist.segments.len());
    for seg in playlist.segments {
        // The encoder may write full paths; the published layout is flat.
        let name = Path::new(&seg.uri)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("bad segment uri '{}'", seg.uri))?;

        let meta = tokio::fs::metadata(out_dir.join(&name))
            .await
            .map_err(|_| format!("segment {name} missing"))?;
        if meta.len() == 0 {
            return Err(format!("segment {name} is empty"));
        }

        segments.push(SegmentInfo {
            uri: name,
            duration: seg.duration,
        });
    }

    check_contiguous(&segments)?;
    Ok(segments)
}
