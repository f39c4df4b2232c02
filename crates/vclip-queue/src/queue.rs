//! In-process priority job queue: a single dispatcher pops jobs off a
//! priority heap and runs them on a fixed-size worker pool.

use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, Semaphore};
use tracing::{debug, info, warn};

use vclip_models::{Job, JobId, JobPriority, JobStatus};

use crate::error::{QueueError, QueueResult};
use crate::job::{JobKind, QueuedJob};
use crate::progress::{ProgressHub, ProgressSender};

/// Runs the actual pipeline work for a job. Implemented by the worker
/// crate; the queue itself knows nothing about fetching, scene
/// extraction, or analysis.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, kind: &JobKind, progress: ProgressSender) -> Result<serde_json::Value, String>;
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_queue_size: usize,
    pub max_workers: usize,
    pub retention: StdDuration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            max_workers: std::env::var("MAX_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            retention: StdDuration::from_secs(3600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
struct Counters {
    submitted: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub running: usize,
    pub max_workers: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResultView {
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub execution_time_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

struct JobRecord {
    job: Job,
    result: Option<serde_json::Value>,
    /// When the job reached a terminal state; drives the retention sweep.
    retained_at: Option<DateTime<Utc>>,
}

struct Inner {
    config: QueueConfig,
    heap: Mutex<BinaryHeap<QueuedJob>>,
    notify: Notify,
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    workers: Semaphore,
    counters: Mutex<Counters>,
    progress: ProgressHub,
}

/// Cheaply cloneable handle to the queue; all clones share one heap,
/// job table, and worker pool.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> Self {
        let max_workers = config.max_workers;
        Self {
            inner: Arc::new(Inner {
                config,
                heap: Mutex::new(BinaryHeap::new()),
                notify: Notify::new(),
                jobs: Mutex::new(HashMap::new()),
                workers: Semaphore::new(max_workers),
                counters: Mutex::new(Counters::default()),
                progress: ProgressHub::new(),
            }),
        }
    }

    pub fn from_env() -> Self {
        Self::new(QueueConfig::from_env())
    }

    pub fn progress_hub(&self) -> ProgressHub {
        self.inner.progress.clone()
    }

    /// Submit a job. Fails with `QueueFull` when the pending-or-running
    /// backlog has already reached `max_queue_size`.
    pub async fn submit(
        &self,
        name: impl Into<String>,
        kind: JobKind,
        priority: JobPriority,
        session_id: impl Into<String>,
    ) -> QueueResult<JobId> {
        let session_id = session_id.into();
        let mut jobs = self.inner.jobs.lock().await;

        let backlog = jobs
            .values()
            .filter(|r| matches!(r.job.status, JobStatus::Pending | JobStatus::Running))
            .count();
        if backlog >= self.inner.config.max_queue_size {
            return Err(QueueError::QueueFull {
                max_queue_size: self.inner.config.max_queue_size,
            });
        }

        let job = Job::new(name, session_id.clone(), priority);
        let job_id = job.id.clone();

        self.inner.heap.lock().await.push(QueuedJob {
            job_id: job_id.clone(),
            session_id,
            priority,
            created_at: job.created_at,
            kind,
        });

        jobs.insert(
            job_id.clone(),
            JobRecord {
                job,
                result: None,
                retained_at: None,
            },
        );
        drop(jobs);

        self.inner.counters.lock().await.submitted += 1;
        self.inner.notify.notify_one();

        Ok(job_id)
    }

    pub async fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.inner.jobs.lock().await.get(job_id).map(|r| r.job.status)
    }

    pub async fn result(&self, job_id: &JobId) -> Option<JobResultView> {
        let jobs = self.inner.jobs.lock().await;
        let record = jobs.get(job_id)?;
        let execution_time_seconds = match (record.job.started_at, record.job.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        };
        Some(JobResultView {
            status: record.job.status,
            result: record.result.clone(),
            error: record.job.error.clone(),
            execution_time_seconds,
            created_at: record.job.created_at,
        })
    }

    /// Cancels only jobs still PENDING; returns false for RUNNING or
    /// already-terminal jobs.
    pub async fn cancel(&self, job_id: &JobId) -> bool {
        let mut jobs = self.inner.jobs.lock().await;
        let Some(record) = jobs.get_mut(job_id) else {
            return false;
        };
        if record.job.status != JobStatus::Pending {
            return false;
        }
        record.job.status = JobStatus::Cancelled;
        record.job.completed_at = Some(Utc::now());
        record.retained_at = Some(Utc::now());
        drop(jobs);

        self.inner.counters.lock().await.cancelled += 1;
        true
    }

    pub async fn queue_status(&self) -> QueueStatus {
        let jobs = self.inner.jobs.lock().await;
        let counters = self.inner.counters.lock().await;
        let queue_size = jobs
            .values()
            .filter(|r| r.job.status == JobStatus::Pending)
            .count();
        let running = jobs
            .values()
            .filter(|r| r.job.status == JobStatus::Running)
            .count();
        QueueStatus {
            queue_size,
            max_queue_size: self.inner.config.max_queue_size,
            running,
            max_workers: self.inner.config.max_workers,
            submitted: counters.submitted,
            completed: counters.completed,
            failed: counters.failed,
            cancelled: counters.cancelled,
        }
    }

    pub async fn session_jobs(&self, session_id: &str) -> Vec<Job> {
        self.inner
            .jobs
            .lock()
            .await
            .values()
            .filter(|r| {
                r.job.session_id == session_id
                    && matches!(r.job.status, JobStatus::Pending | JobStatus::Running)
            })
            .map(|r| r.job.clone())
            .collect()
    }

    /// Start the dispatcher loop. One job runs at a time per worker
    /// slot; the dispatcher itself only ever pops and hands off, never
    /// executes pipeline work inline.
    pub fn spawn_dispatcher(&self, runner: Arc<dyn JobRunner>) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                let queued = match pop_next_pending(&inner).await {
                    Some(q) => q,
                    None => {
                        inner.notify.notified().await;
                        continue;
                    }
                };

                let permit = inner
                    .workers
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("worker semaphore is never closed");

                {
                    let mut jobs = inner.jobs.lock().await;
                    if let Some(record) = jobs.get_mut(&queued.job_id) {
                        record.job.status = JobStatus::Running;
                        record.job.started_at = Some(Utc::now());
                    }
                }

                let runner = runner.clone();
                let inner = inner.clone();
                tokio::spawn(run_one(inner, runner, queued, permit));
            }
        })
    }

    /// Periodically evict completed/failed/cancelled jobs older than
    /// `retention` from the result table.
    pub fn spawn_retention_sweep(&self) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(StdDuration::from_secs(60));
            loop {
                interval.tick().await;
                let cutoff = Utc::now()
                    - chrono::Duration::from_std(inner.config.retention)
                        .unwrap_or_else(|_| chrono::Duration::hours(1));
                let mut jobs = inner.jobs.lock().await;
                let before = jobs.len();
                jobs.retain(|_, record| record.retained_at.map(|at| at > cutoff).unwrap_or(true));
                let evicted = before - jobs.len();
                if evicted > 0 {
                    debug!(evicted, "retention sweep evicted expired job results");
                }
            }
        })
    }
}

async fn pop_next_pending(inner: &Inner) -> Option<QueuedJob> {
    loop {
        let mut heap = inner.heap.lock().await;
        let queued = heap.pop()?;
        drop(heap);

        // A job may have been cancelled while still sitting in the heap.
        let jobs = inner.jobs.lock().await;
        let still_pending = jobs
            .get(&queued.job_id)
            .map(|r| r.job.status == JobStatus::Pending)
            .unwrap_or(false);
        drop(jobs);

        if still_pending {
            return Some(queued);
        }
    }
}

async fn run_one(
    inner: Arc<Inner>,
    runner: Arc<dyn JobRunner>,
    queued: QueuedJob,
    _permit: tokio::sync::OwnedSemaphorePermit,
) {
    let job_id = queued.job_id.clone();
    let progress = inner.progress.sender_for(job_id.clone()).await;

    let outcome = runner.run(&queued.kind, progress).await;

    let mut jobs = inner.jobs.lock().await;
    let mut counters = inner.counters.lock().await;
    if let Some(record) = jobs.get_mut(&job_id) {
        let now = Utc::now();
        record.job.completed_at = Some(now);
        record.retained_at = Some(now);
        match outcome {
            Ok(value) => {
                record.job.status = JobStatus::Completed;
                record.result = Some(value);
                counters.completed += 1;
                info!(job_id = %job_id, "job completed");
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "job failed");
                record.job.status = JobStatus::Failed;
                record.job.error = Some(err);
                counters.failed += 1;
            }
        }
    }
    drop(counters);
    drop(jobs);

    inner.progress.complete(&job_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRunner {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobRunner for CountingRunner {
        async fn run(&self, _kind: &JobKind, progress: ProgressSender) -> Result<serde_json::Value, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            progress.emit("fetch", 10, "starting");
            Ok(serde_json::json!({"ok": true}))
        }
    }

    fn sample_job() -> JobKind {
        JobKind::AnalyzeVideo {
            url: "https://youtube.com/watch?v=abc123".to_string(),
            precision: 5,
        }
    }

    #[tokio::test]
    async fn submit_and_complete_roundtrip() {
        let queue = JobQueue::new(QueueConfig {
            max_queue_size: 10,
            max_workers: 2,
            retention: StdDuration::from_secs(3600),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = Arc::new(CountingRunner {
            calls: calls.clone(),
        });
        queue.spawn_dispatcher(runner);

        let job_id = queue
            .submit("analyze_video", sample_job(), JobPriority::Normal, "session-1")
            .await
            .unwrap();

        for _ in 0..50 {
            if queue.status(&job_id).await == Some(JobStatus::Completed) {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }

        assert_eq!(queue.status(&job_id).await, Some(JobStatus::Completed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let result = queue.result(&job_id).await.unwrap();
        assert_eq!(result.result.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn queue_full_rejects_submission() {
        let queue = JobQueue::new(QueueConfig {
            max_queue_size: 1,
            max_workers: 1,
            retention: StdDuration::from_secs(3600),
        });

        queue
            .submit("analyze_video", sample_job(), JobPriority::Normal, "session-1")
            .await
            .unwrap();

        let second = queue
            .submit("analyze_video", sample_job(), JobPriority::Normal, "session-1")
            .await;
        assert!(matches!(second, Err(QueueError::QueueFull { .. })));
    }

    #[tokio::test]
    async fn cancel_only_affects_pending_jobs() {
        let queue = JobQueue::new(QueueConfig {
            max_queue_size: 10,
            max_workers: 1,
            retention: StdDuration::from_secs(3600),
        });

        let job_id = queue
            .submit("analyze_video", sample_job(), JobPriority::Normal, "session-1")
            .await
            .unwrap();

        assert!(queue.cancel(&job_id).await);
        assert_eq!(queue.status(&job_id).await, Some(JobStatus::Cancelled));
        assert!(!queue.cancel(&job_id).await);
    }
}
