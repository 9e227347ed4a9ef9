//! Background ingestion processing
//!
//! Ingestion parses arbitrary uploads and can be expensive, so it runs on a
//! bounded worker pool instead of inline on the caller's task.

mod queue;
mod worker;

pub use queue::{IngestJob, IngestJobStatus, IngestQueue, JobProgress, QueueStats};
pub use worker::IngestWorker;

use std::sync::Arc;

use crate::config::ProcessingConfig;
use crate::ingestion::DocumentService;

/// Create the job queue and start its worker pool on the current tokio
/// runtime. Returns the queue handle used to submit and track jobs.
pub fn spawn_workers(service: Arc<DocumentService>, config: &ProcessingConfig) -> Arc<IngestQueue> {
    let worker_count = config.worker_count();

    let (queue, receiver) = IngestQueue::new(worker_count, config.queue_depth);
    let queue = Arc::new(queue);

    let worker = IngestWorker::new(service, Arc::clone(&queue), worker_count);
    tokio::spawn(async move {
        worker.run(receiver).await;
    });

    queue
}
