//! vf-media: HLS playlists and manifest assembly.
//!
//! - [`hls`] -- playlist types, M3U8 rendering, and parsing of the
//!   playlists the encoder writes.
//! - [`manifest`] -- the deterministic [`Manifest`] assembler that turns a
//!   set of rendition results into per-rendition playlists plus a master
//!   manifest.

pub mod hls;
pub mod manifest;

pub use manifest::{assemble, Manifest, RenditionEntry, MASTER_PLAYLIST, RENDITION_PLAYLIST};
