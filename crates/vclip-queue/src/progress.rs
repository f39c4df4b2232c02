//! Typed in-process progress stream for running jobs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use vclip_models::JobId;

const CHANNEL_CAPACITY: usize = 256;

/// A single progress update emitted by a running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub stage: String,
    pub percent: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Handed to a `JobRunner` so it can emit progress without knowing
/// anything about the transport. Cloning is cheap; clones all feed the
/// same broadcast channel.
#[derive(Clone)]
pub struct ProgressSender {
    job_id: JobId,
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressSender {
    /// The job this sender reports progress for.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Emit a progress update. Never blocks; a channel with no
    /// subscribers is logged and swallowed, matching the callback
    /// contract (progress callbacks must be non-blocking).
    pub fn emit(&self, stage: impl Into<String>, percent: u8, message: impl Into<String>) {
        let event = ProgressEvent {
            job_id: self.job_id.clone(),
            stage: stage.into(),
            percent,
            message: message.into(),
            timestamp: Utc::now(),
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(job_id = %self.job_id, "progress event dropped: no subscribers");
        }
    }
}

/// Owns one broadcast channel per in-flight job. Channels are created on
/// first use and torn down once the job completes.
#[derive(Clone, Default)]
pub struct ProgressHub {
    channels: Arc<Mutex<HashMap<JobId, broadcast::Sender<ProgressEvent>>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn sender_for(&self, job_id: JobId) -> ProgressSender {
        let mut channels = self.channels.lock().await;
        let tx = channels
            .entry(job_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        ProgressSender { job_id, tx }
    }

    /// Subscribe to progress events for a job already in flight. Returns
    /// `None` if the job hasn't started (or has already finished).
    pub async fn subscribe(&self, job_id: &JobId) -> Option<broadcast::Receiver<ProgressEvent>> {
        let channels = self.channels.lock().await;
        channels.get(job_id).map(|tx| tx.subscribe())
    }

    pub(crate) async fn complete(&self, job_id: &JobId) {
        self.channels.lock().await.remove(job_id);
    }
}
