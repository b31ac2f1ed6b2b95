//! Reader for the media playlists written by the encoder.
//!
//! Only the subset needed to recover the segment list is understood;
//! unknown tags are skipped.

use vf_core::{Error, Result, SegmentInfo};

use super::types::{MediaPlaylist, Segment};

/// Parse an M3U8 media playlist.
pub fn parse_media_playlist(text: &str) -> Result<MediaPlaylist> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if lines.next() != Some("#EXTM3U") {
        return Err(Error::Validation("playlist does not start with #EXTM3U".into()));
    }

    let mut target_duration = 0u64;
    let mut media_sequence = 0u64;
    let mut ended = false;
    let mut segments = Vec::new();
    let mut pending: Option<f64> = None;

    for line in lines {
        if let Some(v) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = parse_num(v, "EXT-X-TARGETDURATION")?;
        } else if let Some(v) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            media_sequence = parse_num(v, "EXT-X-MEDIA-SEQUENCE")?;
        } else if let Some(v) = line.strip_prefix("#EXTINF:") {
            let dur = v.split(',').next().unwrap_or_default();
            let dur: f64 = parse_num(dur, "EXTINF")?;
            if !dur.is_finite() || dur < 0.0 {
                return Err(Error::Validation(format!("invalid EXTINF duration {dur}")));
            }
            pending = Some(dur);
        } else if line == "#EXT-X-ENDLIST" {
            ended = true;
        } else if line.starts_with('#') {
            continue;
        } else {
            let duration = pending.take().ok_or_else(|| {
                Error::Validation(format!("segment '{line}' has no preceding #EXTINF"))
            })?;
            segments.push(Segment {
                duration,
                uri: line.to_string(),
            });
        }
    }

    Ok(MediaPlaylist {
        target_duration,
        media_sequence,
        segments,
        ended,
    })
}

fn parse_num<T: std::str::FromStr>(v: &str, tag: &str) -> Result<T> {
    v.trim()
        .parse()
        .map_err(|_| Error::Validation(format!("invalid {tag} value '{v}'")))
}

/// Numeric index embedded at the end of a segment file stem
/// (`"007.ts"` -> 7, `"seg12.ts"` -> 12).
pub(crate) fn segment_index(uri: &str) -> Option<u64> {
    let name = uri.rsplit('/').next().unwrap_or(uri);
    let stem = name.split('.').next().unwrap_or(name);
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// Check that segments are non-empty, numbered, strictly consecutive, and
/// have positive durations.
pub fn check_contiguous(segments: &[SegmentInfo]) -> std::result::Result<(), String> {
    let Some(first) = segments.first() else {
        return Err("no segments".into());
    };
    let mut expected =
        segment_index(&first.uri).ok_or_else(|| format!("segment '{}' is not numbered", first.uri))?;

    for seg in segments {
        let idx = segment_index(&seg.uri)
            .ok_or_else(|| format!("segment '{}' is not numbered", seg.uri))?;
        if idx != expected {
            return Err(format!(
                "segment gap: expected index {expected}, found '{}'",
                seg.uri
            ));
        }
        if !(seg.duration > 0.0) {
            return Err(format!("segment '{}' has zero duration", seg.uri));
        }
        expected += 1;
    }
    Ok(())
}
