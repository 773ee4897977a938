use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External service failed: {0}")]
    ExternalService(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any backend error (index, inference, search library) as
    /// `ExternalService`, keeping a short context prefix.
    pub fn external<E: std::fmt::Display>(context: &str, err: E) -> Self {
        Self::ExternalService(format!("{context}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
