//! Error types for decoder generation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Decoder generation errors
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Input schema file {} not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("Output folder {} should be a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("No definitions found")]
    NoDefinitions,

    #[error("Definitions '{first}' and '{second}' both derive the name '{name}'")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Cannot derive an identifier from '{0}'")]
    InvalidName(String),

    #[error("Type compiler failed: {0}")]
    TypeCompiler(String),

    #[error("Formatter failed: {0}")]
    Formatter(String),

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
