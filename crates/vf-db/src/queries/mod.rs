//! Query modules, one per table.

pub mod transcode_jobs;
