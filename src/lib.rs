//! vodforge: queue-driven HLS transcoding.
//!
//! The library half of the binary: startup wiring ([`app`]) and the
//! upload checks run before a job is enqueued ([`ingest`]). The pipeline
//! itself lives in the `vf-*` crates.

pub mod app;
pub mod ingest;

pub use vf_core::config::Config;
pub use vf_core::{Error, Result};
