use thiserror::Error;

#[derive(Debug, Error)]
pub enum HitlError {
    /// Blocked client-side; never reaches the network.
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("confirmation request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for HitlError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
