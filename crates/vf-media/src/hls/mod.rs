//! HLS playlist generation and parsing.
//!
//! Supports master playlists (one variant per rendition) and VOD media
//! playlists (segment lists with an end marker), plus a tolerant reader for
//! the media playlists an external encoder leaves behind.

mod generator;
mod parser;
mod types;

pub use generator::{generate_master_playlist, generate_media_playlist};
pub use parser::{check_contiguous, parse_media_playlist};
pub use types::{MasterPlaylist, MediaPlaylist, Segment, Variant};
