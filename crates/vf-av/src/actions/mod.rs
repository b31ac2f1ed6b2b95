//! Encoder actions: per-rendition HLS transcoding and thumbnail extraction.

mod thumbnail;
mod transcode;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use thumbnail::{extract_thumbnail, THUMBNAIL_HEIGHT, THUMBNAIL_OFFSET, THUMBNAIL_WIDTH};
pub use transcode::{hls_args, transcode_rendition, SEGMENT_PATTERN};
