use thiserror::Error;

/// Why a weight-data load attempt failed.
///
/// Every variant is treated the same way for fallback purposes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("invalid weight payload: {0}")]
    InvalidPayload(String),

    #[error("weight source timed out after {0}ms")]
    Timeout(u64),

    #[error("weight source failed: {0}")]
    Source(String),

    #[error("http request failed: {0}")]
    Http(String),
}

impl LoadError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
