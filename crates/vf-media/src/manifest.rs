//! Deterministic manifest assembly.
//!
//! [`assemble`] takes whatever rendition results a job produced, keeps the
//! successful ones, orders them by [`RenditionProfile::listing_key`] and
//! renders one VOD media playlist per rendition plus a master manifest. The
//! output depends only on the set of successful results, never on the order
//! in which they finished.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use vf_core::{Error, RenditionProfile, RenditionResult, Result, SegmentInfo};

use crate::hls::{
    check_contiguous, generate_master_playlist, generate_media_playlist, MasterPlaylist,
    MediaPlaylist, Segment, Variant,
};

/// File name of the master manifest at the root of a published title.
pub const MASTER_PLAYLIST: &str = "master.m3u8";

/// File name of each rendition's media playlist inside its directory.
pub const RENDITION_PLAYLIST: &str = "index.m3u8";

/// One successful rendition as it will appear in the published layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenditionEntry {
    pub profile: RenditionProfile,
    pub playlist: MediaPlaylist,
    /// Staging directory holding the segment files.
    pub source_dir: PathBuf,
}

impl RenditionEntry {
    /// Directory name under the title's public root.
    pub fn dir_name(&self) -> &str {
        &self.profile.label
    }

    /// Playlist URI relative to the master manifest.
    pub fn playlist_uri(&self) -> String {
        format!("{}/{}", self.profile.label, RENDITION_PLAYLIST)
    }

    /// Rendered media playlist body.
    pub fn render(&self) -> String {
        generate_media_playlist(&self.playlist)
    }

    /// Total playable duration in seconds.
    pub fn duration(&self) -> f64 {
        self.playlist.total_duration()
    }
}

/// The assembled output for one title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub content_id: String,
    /// Successful renditions in listing order.
    pub renditions: Vec<RenditionEntry>,
}

impl Manifest {
    /// Rendered master manifest body.
    pub fn master(&self) -> String {
        let variants = self
            .renditions
            .iter()
            .map(|r| Variant {
                bandwidth: r.profile.bandwidth(),
                resolution: Some((r.profile.width, r.profile.height)),
                codecs: r.profile.codecs.clone(),
                name: Some(r.profile.label.clone()),
                uri: r.playlist_uri(),
            })
            .collect();
        generate_master_playlist(&MasterPlaylist { variants })
    }

    /// Labels in listing order.
    pub fn labels(&self) -> Vec<&str> {
        self.renditions.iter().map(|r| r.profile.label.as_str()).collect()
    }

    /// Every generated text file as (path relative to the title root, body).
    pub fn documents(&self) -> Vec<(PathBuf, String)> {
        let mut docs = Vec::with_capacity(self.renditions.len() + 1);
        for r in &self.renditions {
            docs.push((
                PathBuf::from(r.dir_name()).join(RENDITION_PLAYLIST),
                r.render(),
            ));
        }
        docs.push((PathBuf::from(MASTER_PLAYLIST), self.master()));
        docs
    }

    /// Segment files to carry over as (staged source, path relative to the
    /// title root).
    pub fn segment_files(&self) -> Vec<(PathBuf, PathBuf)> {
        self.renditions
            .iter()
            .flat_map(|r| {
                r.playlist.segments.iter().map(move |s| {
                    (
                        r.source_dir.join(&s.uri),
                        PathBuf::from(r.dir_name()).join(&s.uri),
                    )
                })
            })
            .collect()
    }
}

/// Build a [`Manifest`] from the successful subset of `results`.
///
/// Fails with [`Error::Assembly`] when nothing succeeded, when two successful
/// results share a label, or when a result's segments are not a contiguous
/// run.
pub fn assemble(content_id: &str, results: &[RenditionResult]) -> Result<Manifest> {
    let mut ok: Vec<&RenditionResult> = results.iter().filter(|r| r.is_ok()).collect();
    if ok.is_empty() {
        return Err(Error::Assembly(format!(
            "no successful renditions for content '{content_id}'"
        )));
    }

    ok.sort_by(|a, b| a.profile.listing_key().cmp(&b.profile.listing_key()));

    let mut seen = BTreeSet::new();
    let mut renditions = Vec::with_capacity(ok.len());
    for result in ok {
        if !seen.insert(result.profile.label.as_str()) {
            return Err(Error::Assembly(format!(
                "rendition '{}' appears more than once",
                result.profile.label
            )));
        }
        check_contiguous(&result.segments).map_err(|reason| {
            Error::Assembly(format!("rendition '{}': {reason}", result.profile.label))
        })?;

        renditions.push(RenditionEntry {
            profile: result.profile.clone(),
            playlist: MediaPlaylist::vod(result.segments.iter().map(to_segment).collect()),
            source_dir: result.output_dir.clone(),
        });
    }

    tracing::debug!(
        content_id,
        renditions = renditions.len(),
        "Manifest assembled"
    );

    Ok(Manifest {
        content_id: content_id.to_string(),
        renditions,
    })
}

fn to_segment(info: &SegmentInfo) -> Segment {
    Segment {
        duration: info.duration,
        uri: info.uri.clone(),
    }
}
