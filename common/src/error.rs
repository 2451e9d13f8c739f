use std::time::Duration;

use thiserror::Error;

// Core internal errors. Each external dependency failure maps to its own
// variant so callers can tell a slow provider from a broken one.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] surrealdb::Error),
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),
    #[error("Generation provider error: {0}")]
    GenerationProvider(String),
    #[error("Vector index error: {0}")]
    VectorIndex(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{operation} timed out after {waited:?}")]
    ProviderTimeout {
        operation: &'static str,
        waited: Duration,
    },
    #[error("Embedding dimension mismatch: index holds {expected}, provider produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether the orchestrator retry boundary may re-attempt the failed
    /// operation. Validation and dimension mismatches are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingProvider(_)
                | AppError::GenerationProvider(_)
                | AppError::VectorIndex(_)
                | AppError::Storage(_)
                | AppError::ProviderTimeout { .. }
        )
    }
}
