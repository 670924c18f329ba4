use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConformError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Rule file parse error: {0}")]
    RuleParseError(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ConformError {
    /// Process exit code for this error: 1 for failed documents, 2 for everything
    /// that stopped the run before a verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConformError::ValidationError(_) => 1,
            _ => 2,
        }
    }
}
