//! Session manager error types.

use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("maximum concurrent users exceeded and no session reclaimable")]
    CapacityExceeded,

    #[error("unknown session: {0}")]
    NotFound(String),

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
}
