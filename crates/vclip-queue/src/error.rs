//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue full: backlog >= {max_queue_size}")]
    QueueFull { max_queue_size: usize },

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
