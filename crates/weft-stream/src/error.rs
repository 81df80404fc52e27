use thiserror::Error;

/// Failure taxonomy for one ingestion run.
///
/// `Parse` never crosses the ingestor boundary on its own: malformed frames
/// are logged and skipped so a single bad frame cannot abort the run.
/// `Transport` and `Timeout` are fatal to the current attempt; the retry
/// wrapper folds the last of them into `RetriesExhausted`.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connection error: {0}")]
    Transport(String),

    #[error("connection timed out after {}s of inactivity, check network and retry", .elapsed_ms / 1000)]
    Timeout { elapsed_ms: u64 },

    #[error("malformed frame: {reason}")]
    Parse { reason: String, frame: String },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl StreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// User-visible phrasing, distinguishing timeout from generic
    /// connection failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
