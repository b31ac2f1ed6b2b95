//! The [`Transcoder`] trait is the worker's only view of the encoder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use vf_core::{RenditionProfile, RenditionResult};

use crate::actions::{extract_thumbnail, transcode_rendition};
use crate::tools::{ToolRegistry, FFMPEG};

/// Produces HLS renditions and poster frames from a source file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode one rendition into `staging_dir/<label>/`.
    ///
    /// Must not fail: encoder errors come back as a failed
    /// [`RenditionResult`] so sibling renditions are unaffected.
    async fn transcode(
        &self,
        source: &Path,
        profile: &RenditionProfile,
        staging_dir: &Path,
    ) -> RenditionResult;

    /// Write a poster frame for `source` to `dest`.
    async fn thumbnail(&self, source: &Path, dest: &Path) -> vf_core::Result<()>;
}

/// [`Transcoder`] backed by an ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    /// Use the ffmpeg found by the registry.
    pub fn from_registry(tools: &ToolRegistry, timeout: Option<Duration>) -> vf_core::Result<Self> {
        let ffmpeg = tools.require(FFMPEG)?;
        Ok(Self::new(ffmpeg.path.clone(), timeout))
    }

    pub fn new(ffmpeg: PathBuf, timeout: Option<Duration>) -> Self {
        Self { ffmpeg, timeout }
    }

    pub fn program(&self) -> &Path {
        &self.ffmpeg
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        profile: &RenditionProfile,
        staging_dir: &Path,
    ) -> RenditionResult {
        transcode_rendition(&self.ffmpeg, self.timeout, source, profile, staging_dir).await
    }

    async fn thumbnail(&self, source: &Path, dest: &Path) -> vf_core::Result<()> {
        extract_thumbnail(&self.ffmpeg, self.timeout, source, dest).await
    }
}
