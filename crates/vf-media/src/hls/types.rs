//! HLS playlist types.

use serde::{Deserialize, Serialize};

/// A stream variant in a master playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// Optional resolution as (width, height).
    pub resolution: Option<(u32, u32)>,
    /// Codec string (e.g. "avc1.640028,mp4a.40.2").
    pub codecs: String,
    /// Optional NAME attribute shown by some players.
    pub name: Option<String>,
    /// URI to the media playlist for this variant.
    pub uri: String,
}

/// A single segment in a media playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment duration in seconds.
    pub duration: f64,
    /// URI for this segment.
    pub uri: String,
}

/// An HLS master playlist containing multiple stream variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterPlaylist {
    /// Stream variants in listing order.
    pub variants: Vec<Variant>,
}

/// An HLS media playlist describing a sequence of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlaylist {
    /// Maximum segment duration in integer seconds (rounded up).
    pub target_duration: u64,
    /// Sequence number of the first segment.
    pub media_sequence: u64,
    /// Segments in playback order.
    pub segments: Vec<Segment>,
    /// Whether `#EXT-X-ENDLIST` is present.
    pub ended: bool,
}

impl MediaPlaylist {
    /// A complete VOD playlist over `segments`, with the target duration
    /// derived from the longest segment.
    pub fn vod(segments: Vec<Segment>) -> Self {
        let longest = segments.iter().map(|s| s.duration).fold(0.0_f64, f64::max);
        Self {
            target_duration: (longest.ceil() as u64).max(1),
            media_sequence: 0,
            segments,
            ended: true,
        }
    }

    /// Sum of all segment durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}
