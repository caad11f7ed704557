//! Service trait definitions for dependency injection
//!
//! The request pipeline only talks to randomness, response output and the
//! terminal handler through these traits, so tests can swap each of them.

use async_trait::async_trait;

use crate::error::{FaultError, FaultResult};

/// Source of uniform samples for error injection
#[mockall::automock]
pub trait FaultSampler: Send + Sync {
    /// Draw one sample in `[0, 1)`
    fn sample(&self) -> f64;
}

/// Byte sink a response body is written into
#[mockall::automock]
#[async_trait]
pub trait ResponseSink: Send {
    /// Accept the whole chunk, returning its length
    async fn write(&mut self, chunk: &[u8]) -> FaultResult<usize>;

    /// Push everything written so far to the client.
    ///
    /// Sinks that cannot flush keep this default.
    async fn flush(&mut self) -> FaultResult<()> {
        Err(FaultError::FlushUnsupported)
    }
}

/// Produces the body of a request that made it through the pipeline
#[async_trait]
pub trait TerminalHandler: Send + Sync {
    /// Content type of the produced body
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    /// Write the full response body into `sink`
    async fn serve(&self, sink: &mut dyn ResponseSink) -> FaultResult<()>;
}
