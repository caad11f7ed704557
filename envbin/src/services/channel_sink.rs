//! Response sink backed by a channel feeding a streaming HTTP body

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use tokio::sync::mpsc;

use crate::error::{FaultError, FaultResult};
use crate::traits::ResponseSink;

/// One piece of a streamed body; an `Err` aborts the response mid-stream
pub type BodyChunk = Result<Bytes, std::io::Error>;

/// Chunks buffered between the writer task and the HTTP connection
pub const BODY_CHANNEL_CAPACITY: usize = 4;

/// Buffers writes and hands them to the connection on flush
pub struct ChannelSink {
    tx: mpsc::Sender<BodyChunk>,
    pending: Vec<u8>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<BodyChunk>) -> Self {
        Self {
            tx,
            pending: Vec::new(),
        }
    }

    /// Create a sink together with the streaming body it feeds
    pub fn with_body() -> (Self, Body) {
        let (tx, rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        (Self::new(tx), body_from_channel(rx))
    }

    /// Bytes written but not yet flushed
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Terminate the body with an error so the client sees a broken response
    pub async fn abort(self, error: &FaultError) {
        let _ = self
            .tx
            .send(Err(std::io::Error::other(error.to_string())))
            .await;
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn write(&mut self, chunk: &[u8]) -> FaultResult<usize> {
        if self.tx.is_closed() {
            return Err(FaultError::SinkClosed);
        }
        self.pending.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    async fn flush(&mut self) -> FaultResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::take(&mut self.pending));
        self.tx.send(Ok(chunk)).await.map_err(|_| FaultError::SinkClosed)
    }
}

/// Adapt the receiving end of a body channel into an axum body
pub fn body_from_channel(rx: mpsc::Receiver<BodyChunk>) -> Body {
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    Body::from_stream(stream)
}
