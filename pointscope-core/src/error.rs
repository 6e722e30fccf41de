//! Error types for pointscope

use thiserror::Error;

/// Main error type for pointscope operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Load failed: {0}")]
    Load(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

/// Result type alias for pointscope operations
pub type Result<T> = std::result::Result<T, Error>;
