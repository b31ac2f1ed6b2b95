//! # vf-av
//!
//! Encoder integration for the vodforge pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- locate ffmpeg on `PATH` or at
//!   a configured path.
//! - **Command execution** ([`ToolCommand`]) -- async builder with an
//!   optional timeout; the child is killed if the future is dropped.
//! - **Staging** ([`JobWorkspace`]) -- one private directory per job attempt
//!   under the staging root, removed when the attempt ends.
//! - **Actions** ([`actions`]) -- HLS transcoding of one rendition and
//!   thumbnail extraction.
//! - **The [`Transcoder`] seam** -- what the worker calls, implemented by
//!   [`FfmpegTranscoder`].

pub mod actions;
pub mod command;
pub mod engine;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use engine::{FfmpegTranscoder, Transcoder};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::JobWorkspace;

pub use actions::{extract_thumbnail, hls_args, transcode_rendition};
