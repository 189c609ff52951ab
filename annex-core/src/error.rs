use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid mapping '{name}': {reason}")]
    InvalidMapping { name: String, reason: String },

    #[error("Mapping '{0}' is already registered")]
    DuplicateMapping(String),

    #[error("No collector registered for mapping '{0}'")]
    UnknownMapping(String),

    #[error("Metrics registration error: {0}")]
    Registration(#[from] prometheus::Error),
}
