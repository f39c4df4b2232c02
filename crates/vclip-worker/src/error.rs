//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vclip_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vclip_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vclip_queue::QueueError),

    #[error("Session error: {0}")]
    Session(#[from] vclip_session::SessionError),

    #[error("Provider error: {0}")]
    Provider(#[from] vclip_providers::ProviderError),

    #[error("Unsupported or malformed URL: {0}")]
    InvalidUrl(String),

    #[error("Scene detection timed out after {0}s")]
    SceneTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }
}
