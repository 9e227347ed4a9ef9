//! Background worker pool for ingestion jobs

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};

use crate::ingestion::DocumentService;

use super::queue::{IngestJob, IngestQueue};

/// Worker pool that drains the ingestion queue.
///
/// Parsing and the ingestion transaction are blocking work, so each job runs
/// on the blocking thread pool; a semaphore bounds how many run at once so a
/// burst of uploads cannot starve unrelated requests.
pub struct IngestWorker {
    service: Arc<DocumentService>,
    queue: Arc<IngestQueue>,
    parallel_jobs: usize,
}

impl IngestWorker {
    pub fn new(
        service: Arc<DocumentService>,
        queue: Arc<IngestQueue>,
        parallel_jobs: usize,
    ) -> Self {
        Self {
            service,
            queue,
            parallel_jobs: parallel_jobs.max(1),
        }
    }

    /// Process jobs from the queue until the channel closes
    pub async fn run(self, mut receiver: mpsc::Receiver<IngestJob>) {
        tracing::info!("Ingestion worker started: {} parallel jobs", self.parallel_jobs);

        let semaphore = Arc::new(Semaphore::new(self.parallel_jobs));

        while let Some(job) = receiver.recv().await {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            let service = Arc::clone(&self.service);
            let queue = Arc::clone(&self.queue);

            tokio::spawn(async move {
                let _permit = permit;
                Self::process_job(service, queue, job).await;
            });
        }

        tracing::info!("Ingestion worker stopped");
    }

    async fn process_job(service: Arc<DocumentService>, queue: Arc<IngestQueue>, job: IngestJob) {
        let job_id = job.id;

        // Cancellation is honored only while the job is still queued; once
        // the transaction has started it commits or rolls back as a unit.
        if queue.is_cancelled(job_id) {
            tracing::info!(%job_id, filename = %job.filename, "Skipping cancelled job");
            return;
        }

        queue.mark_processing(job_id);
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            service.create_document(
                &job.title,
                &job.filename,
                &job.data,
                job.suggestions.as_deref(),
                job.keywords.as_deref(),
                job.last_edited_by,
            )
        })
        .await;

        match result {
            Ok(Ok(document)) => {
                tracing::info!(
                    %job_id,
                    document_id = document.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Ingestion job complete"
                );
                queue.mark_complete(job_id, document.id);
            }
            Ok(Err(e)) => {
                tracing::error!(%job_id, "Ingestion job failed: {}", e);
                queue.mark_failed(job_id, e.to_string());
            }
            Err(e) => {
                tracing::error!(%job_id, "Ingestion task aborted: {}", e);
                queue.mark_failed(job_id, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::extraction::ExtractorRegistry;
    use crate::processing::{spawn_workers, IngestJobStatus};
    use crate::storage::SearchDb;
    use std::time::Duration;
    use uuid::Uuid;

    fn test_service() -> (Arc<DocumentService>, Arc<SearchDb>) {
        let db = Arc::new(SearchDb::in_memory().unwrap());
        let extractors = Arc::new(ExtractorRegistry::with_default_extractors());
        (
            Arc::new(DocumentService::new(Arc::clone(&db), extractors)),
            db,
        )
    }

    async fn wait_for_terminal_status(queue: &IngestQueue, job_id: Uuid) -> IngestJobStatus {
        for _ in 0..200 {
            if let Some(progress) = queue.progress(job_id) {
                match progress.status {
                    IngestJobStatus::Queued | IngestJobStatus::Processing => {}
                    status => return status,
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not reach a terminal status");
    }

    #[tokio::test]
    async fn test_background_ingestion_completes() {
        let (service, db) = test_service();
        let config = ProcessingConfig {
            workers: Some(2),
            queue_depth: 10,
        };

        let queue = spawn_workers(service, &config);

        let job_id = queue
            .submit(IngestJob::new(
                "Async Notes",
                "notes.txt",
                b"queued content".to_vec(),
                None,
                None,
                1,
            ))
            .await;

        let status = wait_for_terminal_status(&queue, job_id).await;

        assert_eq!(status, IngestJobStatus::Complete);
        assert!(queue.progress(job_id).unwrap().document_id.is_some());
        assert_eq!(db.count_rows("document").unwrap(), 1);
        assert_eq!(queue.stats().complete, 1);
    }

    #[tokio::test]
    async fn test_failed_extraction_marks_job_failed() {
        let (service, db) = test_service();
        let config = ProcessingConfig {
            workers: Some(1),
            queue_depth: 10,
        };

        let queue = spawn_workers(service, &config);

        let job_id = queue
            .submit(IngestJob::new(
                "Broken",
                "broken.pdf",
                b"not a pdf".to_vec(),
                None,
                None,
                1,
            ))
            .await;

        let status = wait_for_terminal_status(&queue, job_id).await;

        assert_eq!(status, IngestJobStatus::Failed);
        assert!(queue.progress(job_id).unwrap().error.is_some());
        assert_eq!(db.count_rows("document").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_job_never_starts_a_transaction() {
        let (service, db) = test_service();

        let (queue, mut receiver) = IngestQueue::new(1, 10);
        let queue = Arc::new(queue);

        let job_id = queue
            .submit(IngestJob::new(
                "Cancelled",
                "cancelled.txt",
                b"never stored".to_vec(),
                None,
                None,
                1,
            ))
            .await;

        assert!(queue.cancel(job_id));

        // Drain the job the way the worker loop would and process it after
        // the cancellation landed.
        let job = receiver.recv().await.unwrap();
        IngestWorker::process_job(service, Arc::clone(&queue), job).await;

        assert_eq!(
            queue.progress(job_id).unwrap().status,
            IngestJobStatus::Cancelled
        );
        assert_eq!(db.count_rows("document").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_is_rejected_after_completion() {
        let (service, _db) = test_service();
        let config = ProcessingConfig {
            workers: Some(1),
            queue_depth: 10,
        };

        let queue = spawn_workers(service, &config);

        let job_id = queue
            .submit(IngestJob::new(
                "Done",
                "done.txt",
                b"content".to_vec(),
                None,
                None,
                1,
            ))
            .await;

        wait_for_terminal_status(&queue, job_id).await;

        assert!(!queue.cancel(job_id));
    }
}
