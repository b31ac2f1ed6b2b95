//! Shared state handed to every worker task.

use std::sync::Arc;

use vf_av::Transcoder;
use vf_core::config::Config;
use vf_db::JobQueue;

use crate::store::ArtifactStore;

/// Everything a worker needs to run jobs.
///
/// Cheap to clone: all fields are reference-counted or already `Clone`.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Arc<Config>,
    pub queue: JobQueue,
    pub store: Arc<dyn ArtifactStore>,
    pub transcoder: Arc<dyn Transcoder>,
}

impl WorkerContext {
    pub fn new(
        config: Config,
        queue: JobQueue,
        store: Arc<dyn ArtifactStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            queue,
            store,
            transcoder,
        }
    }
}
