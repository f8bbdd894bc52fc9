//! Error types for sparse-model I/O

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a sparse model
#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: {message} (byte offset {offset})", .path.display())]
    Format {
        path: PathBuf,
        offset: u64,
        message: String,
    },

    #[error("referential integrity: {message}")]
    Referential { message: String },
}

/// Result type alias for sparse-model I/O
pub type Result<T> = std::result::Result<T, IoError>;
