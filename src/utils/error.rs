//! Error types and handling
//!
//! Application-level errors for the configuration layer. Recording errors have
//! their own type in `recorder::error`.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
