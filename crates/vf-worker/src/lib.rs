//! # vf-worker
//!
//! The execution side of vodforge.
//!
//! - [`store`] -- the [`ArtifactStore`] that publishes a title's full file
//!   set in one atomic step.
//! - [`readiness`] -- the startup gate that waits for the database, storage
//!   and encoder before any job is claimed.
//! - [`worker`] -- the [`WorkerPool`]: claim loops, lease heartbeats, the
//!   reaper, and per-job orchestration.

pub mod context;
pub mod readiness;
pub mod store;
pub mod worker;

pub use context::WorkerContext;
pub use readiness::{await_ready, DatabaseCheck, DependencyCheck, StorageCheck, ToolCheck};
pub use store::{ArtifactStore, LocalArtifactStore, PublishedTitle, StagedFile, THUMBNAIL_FILE};
pub use worker::{process_job, JobOutcome, WorkerPool};
