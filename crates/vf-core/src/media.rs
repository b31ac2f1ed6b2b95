//! Media-domain types: rendition profiles, per-rendition results, and the
//! job status state machine.
//!
//! Enums serialize in lowercase and implement `Display` manually so the
//! same string form is used in the database, in logs, and on the CLI.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a transcode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Claimed,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// String form stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Succeeded and Failed jobs never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "claimed" => Ok(Self::Claimed),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::Validation(format!("unknown job status '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// RenditionProfile
// ---------------------------------------------------------------------------

/// One target quality tier. Configured ahead of time and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenditionProfile {
    /// Tier label, also the rendition's directory name (e.g. "720p").
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Target video bitrate in kbit/s.
    pub video_kbps: u32,
    /// Target audio bitrate in kbit/s.
    #[serde(default = "default_audio_kbps")]
    pub audio_kbps: u32,
    /// Target segment length in seconds.
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u32,
    /// Listing rank in the master manifest; lower ranks are listed first.
    #[serde(default)]
    pub rank: u32,
    /// CODECS attribute advertised in the master manifest.
    #[serde(default = "default_codecs")]
    pub codecs: String,
}

fn default_audio_kbps() -> u32 {
    128
}
fn default_segment_duration() -> u32 {
    10
}
fn default_codecs() -> String {
    "avc1.640028,mp4a.40.2".into()
}

impl RenditionProfile {
    /// Build a profile with the default audio bitrate, segment length and codecs.
    pub fn new(label: impl Into<String>, width: u32, height: u32, video_kbps: u32, rank: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            video_kbps,
            audio_kbps: default_audio_kbps(),
            segment_duration: default_segment_duration(),
            rank,
            codecs: default_codecs(),
        }
    }

    /// Peak bandwidth in bits per second (video + audio).
    pub fn bandwidth(&self) -> u64 {
        (u64::from(self.video_kbps) + u64::from(self.audio_kbps)) * 1000
    }

    /// Total ordering used for manifest listing: configured rank, then
    /// highest bandwidth, then label.
    pub fn listing_key(&self) -> (u32, Reverse<u64>, &str) {
        (self.rank, Reverse(self.bandwidth()), self.label.as_str())
    }

    /// The stock ladder: 1080p, 720p, 480p.
    pub fn default_ladder() -> Vec<Self> {
        vec![
            Self::new("1080p", 1920, 1080, 5000, 0),
            Self::new("720p", 1280, 720, 2500, 1),
            Self::new("480p", 854, 480, 1000, 2),
        ]
    }
}

// ---------------------------------------------------------------------------
// Rendition results
// ---------------------------------------------------------------------------

/// A media segment produced by the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// File name relative to the rendition directory (e.g. "003.ts").
    pub uri: String,
    /// Duration in seconds.
    pub duration: f64,
}

/// Whether a rendition attempt produced usable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum RenditionOutcome {
    Ok,
    Failed(String),
}

/// The result of one rendition attempt within one job attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionResult {
    pub profile: RenditionProfile,
    pub outcome: RenditionOutcome,
    /// Segments in playback order; empty on failure.
    pub segments: Vec<SegmentInfo>,
    /// Encoder-written playlist inside the staging directory.
    pub playlist_path: Option<PathBuf>,
    /// Staging directory holding this rendition's files.
    pub output_dir: PathBuf,
}

impl RenditionResult {
    /// A successful rendition.
    pub fn ok(
        profile: RenditionProfile,
        output_dir: PathBuf,
        playlist_path: PathBuf,
        segments: Vec<SegmentInfo>,
    ) -> Self {
        Self {
            profile,
            outcome: RenditionOutcome::Ok,
            segments,
            playlist_path: Some(playlist_path),
            output_dir,
        }
    }

    /// A failed rendition.
    pub fn failed(profile: RenditionProfile, output_dir: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            profile,
            outcome: RenditionOutcome::Failed(reason.into()),
            segments: Vec::new(),
            playlist_path: None,
            output_dir,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == RenditionOutcome::Ok
    }

    /// Failure reason, if the rendition failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            RenditionOutcome::Ok => None,
            RenditionOutcome::Failed(reason) => Some(reason),
        }
    }
}
