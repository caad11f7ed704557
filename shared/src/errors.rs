//! Shared error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid log level: {level}")]
    InvalidLogLevel { level: String },

    #[error("Tracing initialisation failed: {message}")]
    TracingInit { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
