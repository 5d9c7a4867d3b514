//! Failure taxonomy for the quote pipeline.

use thiserror::Error;

use crate::core::rate::ParseQuoteError;

/// Upstream fetch failures. Every variant is surfaced to the service's
/// caller; none is ever folded into a default value.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The deadline elapsed before the response was fully read.
    #[error("upstream fetch timed out")]
    Timeout,

    /// Connection or transfer failure.
    #[error("upstream transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Malformed body, or the expected currency-pair field is missing.
    #[error("upstream response parse error: {0}")]
    Parse(String),
}

impl From<ParseQuoteError> for FetchError {
    fn from(err: ParseQuoteError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Persistence failures. The service logs these and still responds with the
/// quote already obtained.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The deadline elapsed during the existence-check or the insert.
    #[error("store write timed out")]
    Timeout,

    /// The durable structure could not be opened or created.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The insert failed after the structure was confirmed to exist.
    #[error("store write failed: {0}")]
    WriteFailed(String),
}

/// Requester-side failures, one variant per pipeline stage.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("quote request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("local record write failed: {0}")]
    LocalWrite(#[source] std::io::Error),
}

impl RequestError {
    /// Name of the stage that failed, for log scanning.
    pub fn stage(&self) -> &'static str {
        match self {
            RequestError::Timeout => "deadline",
            RequestError::Transport(_) => "transport",
            RequestError::Parse(_) => "parse",
            RequestError::LocalWrite(_) => "local-write",
        }
    }
}
