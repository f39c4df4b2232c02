//! Provider error taxonomy.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider config invalid: {0}")]
    Config(String),

    #[error("{provider} request failed: {message}")]
    Request { provider: &'static str, message: String },

    #[error("{provider} returned {status}: {body}")]
    BadStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} response missing expected content")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} response was not valid JSON: {message}")]
    Decode { provider: &'static str, message: String },

    #[error("provider call timed out after {0}s")]
    Timeout(u64),
}
