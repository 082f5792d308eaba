use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Timeout, connection failure, 5xx or rate-limit response. Retried
    /// forever with a fixed delay; never surfaced as a run failure.
    #[error("transient network error: {0}")]
    Transient(String),

    /// Non-rate-limit 4xx. Aborts the current market's loop only; its
    /// checkpoint is left untouched so the market re-runs from scratch.
    #[error("client error (HTTP {status}): {message}")]
    PermanentClient { status: u16, message: String },

    /// Response decoded but did not have the expected shape. Whether this
    /// aborts the market or degrades to skipped records is a parse-policy
    /// configuration choice, not hard-coded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Checkpoint store failure. Fatal to the whole run: forward progress
    /// cannot be safely recorded without it.
    #[error("checkpoint store error: {0}")]
    Checkpoint(String),

    /// Output sink or other local IO failure. Aborts the market only.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    /// True for failures the fetch loop retries at the same offset.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Transient(_))
    }
}

impl From<String> for DomainError {
    fn from(s: String) -> Self {
        DomainError::Storage(s)
    }
}
