use std::error::Error;
use thiserror::Error;

/// Result alias shared by every match-store backend.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-agnostic persistence failure.
///
/// Backends fold their own error enums into this one at the trait boundary,
/// keeping the services layer free of database-specific types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Description of the operation that failed.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a backend failure, keeping it as the error source.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
