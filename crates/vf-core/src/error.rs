//! Unified error type for the vodforge pipeline.
//!
//! All crates funnel their failures into [`Error`]. The worker consults
//! [`Error::is_retryable`] to decide whether a failed job goes back to the
//! queue or is surfaced to an operator straight away.

use std::fmt;
use std::time::Duration;

/// Unified error type covering all failure modes in vodforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A non-terminal job already exists for this content.
    #[error("Duplicate job: content {content_id} already has a pending or claimed job")]
    DuplicateJob {
        /// The content identifier that collided.
        content_id: String,
    },

    /// A single rendition could not be encoded or produced invalid output.
    #[error("Encode failure [{rendition}]: {reason}")]
    Encode {
        /// Label of the rendition that failed.
        rendition: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// No manifest could be assembled (no successful renditions).
    #[error("Assembly error: {0}")]
    Assembly(String),

    /// The atomic publish of an artifact set did not complete.
    #[error("Publish failure [{content_id}]: {message}")]
    Publish {
        /// Content whose artifact set was being published.
        content_id: String,
        /// Human-readable error description.
        message: String,
    },

    /// One or more dependencies never became ready.
    #[error("Readiness timeout after {waited:?}: still waiting on {}", pending.join(", "))]
    ReadinessTimeout {
        /// Names of the checks that never succeeded.
        pending: Vec<String>,
        /// How long the gate waited.
        waited: Duration,
    },

    /// The caller's lease on a job is no longer current.
    #[error("Lease lost on job {job_id}")]
    LeaseLost {
        /// The job whose lease was lost.
        job_id: String,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "job").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a job that failed with this error should be handed back to
    /// the queue for another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::Validation(_) | Error::DuplicateJob { .. } | Error::LeaseLost { .. }
        )
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Encode`].
    pub fn encode(rendition: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Encode {
            rendition: rendition.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`Error::Publish`].
    pub fn publish(content_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Publish {
            content_id: content_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
