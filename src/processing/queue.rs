//! Job queue for background document ingestion

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A queued ingestion request
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub id: Uuid,
    pub title: String,
    pub filename: String,
    pub data: Vec<u8>,
    pub suggestions: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub last_edited_by: i64,
}

impl IngestJob {
    pub fn new(
        title: impl Into<String>,
        filename: impl Into<String>,
        data: Vec<u8>,
        suggestions: Option<Vec<String>>,
        keywords: Option<Vec<String>>,
        last_edited_by: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            filename: filename.into(),
            data,
            suggestions,
            keywords,
            last_edited_by,
        }
    }
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestJobStatus {
    Queued,
    Processing,
    Complete,
    Failed,
    Cancelled,
}

/// Progress information for a job
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub filename: String,
    pub status: IngestJobStatus,
    /// Id of the created document, set on completion
    pub document_id: Option<i64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    fn new(job_id: Uuid, filename: String) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            filename,
            status: IngestJobStatus::Queued,
            document_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Queue for managing background ingestion jobs
pub struct IngestQueue {
    jobs: Arc<DashMap<Uuid, JobProgress>>,
    sender: mpsc::Sender<IngestJob>,
    queue_size: Arc<AtomicUsize>,
    worker_count: usize,
}

impl IngestQueue {
    /// Create a new queue with the given worker count and channel depth
    pub fn new(worker_count: usize, queue_depth: usize) -> (Self, mpsc::Receiver<IngestJob>) {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));

        let queue = Self {
            jobs: Arc::new(DashMap::new()),
            sender,
            queue_size: Arc::new(AtomicUsize::new(0)),
            worker_count,
        };

        (queue, receiver)
    }

    /// Submit a job for background processing
    pub async fn submit(&self, job: IngestJob) -> Uuid {
        let job_id = job.id;

        self.jobs
            .insert(job_id, JobProgress::new(job_id, job.filename.clone()));
        self.queue_size.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.sender.send(job).await {
            tracing::error!(%job_id, "Failed to submit ingestion job: {}", e);
            self.mark_failed(job_id, e.to_string());
        }

        job_id
    }

    /// Cancel a job that has not started yet.
    ///
    /// Returns true when the job was still queued; a job whose transaction
    /// is already running is not interrupted.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let Some(mut progress) = self.jobs.get_mut(&job_id) else {
            return false;
        };

        if progress.status != IngestJobStatus::Queued {
            return false;
        }

        progress.status = IngestJobStatus::Cancelled;
        progress.updated_at = Utc::now();
        self.queue_size.fetch_sub(1, Ordering::SeqCst);
        true
    }

    /// Whether the job has been cancelled
    pub fn is_cancelled(&self, job_id: Uuid) -> bool {
        self.jobs
            .get(&job_id)
            .map(|p| p.status == IngestJobStatus::Cancelled)
            .unwrap_or(false)
    }

    /// Get job progress
    pub fn progress(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs.get(&job_id).map(|p| p.clone())
    }

    /// Get all jobs
    pub fn list_jobs(&self) -> Vec<JobProgress> {
        self.jobs.iter().map(|e| e.value().clone()).collect()
    }

    /// Queue statistics
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total_jobs: self.jobs.len(),
            worker_count: self.worker_count,
            ..QueueStats::default()
        };

        for entry in self.jobs.iter() {
            match entry.status {
                IngestJobStatus::Queued => stats.queued += 1,
                IngestJobStatus::Processing => stats.processing += 1,
                IngestJobStatus::Complete => stats.complete += 1,
                IngestJobStatus::Failed => stats.failed += 1,
                IngestJobStatus::Cancelled => stats.cancelled += 1,
            }
        }

        stats
    }

    pub(crate) fn mark_processing(&self, job_id: Uuid) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = IngestJobStatus::Processing;
            progress.updated_at = Utc::now();
        }
    }

    pub(crate) fn mark_complete(&self, job_id: Uuid, document_id: i64) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = IngestJobStatus::Complete;
            progress.document_id = Some(document_id);
            progress.updated_at = Utc::now();
            self.queue_size.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn mark_failed(&self, job_id: Uuid, error: String) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = IngestJobStatus::Failed;
            progress.error = Some(error);
            progress.updated_at = Utc::now();
            self.queue_size.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub total_jobs: usize,
    pub queued: usize,
    pub processing: usize,
    pub complete: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub worker_count: usize,
}
