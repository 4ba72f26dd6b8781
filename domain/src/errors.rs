//! Failure taxonomy shared by the ingestion job and the HTTP API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credential or invalid settings; fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),
    /// The request was rejected before any external call was made.
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Database not initialized.")]
    StoreUnavailable,
    #[error("Vector store error: {0}")]
    Store(String),
    #[error("Could not extract text from {file}: {reason}")]
    Extraction { file: String, reason: String },
    #[error("Embedding failed: {0}")]
    Embedding(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    /// The model returned text that is not JSON at all.
    #[error("Model output is not valid JSON: {0}")]
    InvalidJson(String),
    /// The model returned JSON that does not match the comparison result shape.
    #[error("Malformed generation output: {0}")]
    MalformedOutput(String),
}

impl PipelineError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    pub fn store(err: anyhow::Error) -> Self {
        PipelineError::Store(format!("{err:#}"))
    }

    pub fn embedding(err: anyhow::Error) -> Self {
        PipelineError::Embedding(format!("{err:#}"))
    }

    pub fn generation(err: anyhow::Error) -> Self {
        PipelineError::Generation(format!("{err:#}"))
    }
}
