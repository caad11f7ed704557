//! Fault service error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaultError {
    #[error("invalid value {value:?} for {setting}: {reason}")]
    Parse {
        setting: &'static str,
        value: String,
        reason: String,
    },

    #[error("response sink does not support flushing")]
    FlushUnsupported,

    #[error("response sink closed by peer")]
    SinkClosed,

    #[error("failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Status collection failed: {0}")]
    Status(String),

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FaultError {
    /// Build a parse error for a control input
    pub fn parse(setting: &'static str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            setting,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Integration faults abort the affected response, never the process
    pub fn is_integration_fault(&self) -> bool {
        matches!(self, Self::FlushUnsupported | Self::SinkClosed)
    }
}

pub type FaultResult<T> = Result<T, FaultError>;
