//! vf-db: durable job queue persistence.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, the [`models::TranscodeJob`] record, free query
//! functions over a connection, and the [`queue::JobQueue`] service that
//! workers use to claim, complete and fail jobs.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod queue;

pub use models::{Lease, NewJob, TranscodeJob};
pub use queue::JobQueue;
