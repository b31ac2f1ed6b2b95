//! vf-core: shared types, IDs, errors, configuration, and retry policy.
//!
//! This crate is the foundational dependency for all other vf-* crates,
//! providing type-safe identifiers, a unified error type, the rendition
//! and job-status domain types, application configuration, and the
//! bounded retry policy handed to the job queue.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;
pub mod retry;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
pub use retry::RetryPolicy;
