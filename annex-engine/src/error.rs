use annex_core::CoreError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watch stream for '{resource}' failed: {message}")]
    Stream { resource: String, message: String },

    #[error("Watch stream for '{0}' ended unexpectedly")]
    StreamEnded(String),

    #[error("Routing error: {0}")]
    Vault(#[from] CoreError),

    #[error("Watch worker aborted: {0}")]
    Worker(String),
}

impl From<JoinError> for WatchError {
    fn from(err: JoinError) -> Self {
        WatchError::Worker(err.to_string())
    }
}
