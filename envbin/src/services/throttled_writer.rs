//! Bandwidth-capped response writer
//!
//! The cap is re-read from the settings store at the start of every write, so
//! a control change reaches streams that are already open on their next
//! write. The write in progress keeps the cap it started with.

use async_trait::async_trait;
use std::sync::Arc;

use shared::InstanceId;

use crate::core::{RateLimiter, SettingsStore};
use crate::error::FaultResult;
use crate::traits::ResponseSink;

pub struct ThrottledWriter<S> {
    inner: S,
    settings: Arc<SettingsStore>,
    limiter: RateLimiter,
    applied_cap: u64,
}

impl<S: ResponseSink> ThrottledWriter<S> {
    pub fn new(inner: S, settings: Arc<SettingsStore>) -> Self {
        let applied_cap = settings.bandwidth_cap();
        Self {
            inner,
            settings,
            limiter: RateLimiter::new(applied_cap),
            applied_cap,
        }
    }

    /// Cap currently enforced by the limiter
    pub fn applied_cap(&self) -> u64 {
        self.applied_cap
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn sync_cap(&mut self) {
        let cap = self.settings.bandwidth_cap();
        if cap != self.applied_cap {
            self.limiter.set_limit(cap);
            self.applied_cap = cap;
            shared::instance_debug!(InstanceId::current(), "adjusted writer bandwidth to {} bytes/s", cap);
        }
    }
}

#[async_trait]
impl<S: ResponseSink> ResponseSink for ThrottledWriter<S> {
    /// Write `chunk` no faster than the cap, flushing after every granted piece
    async fn write(&mut self, chunk: &[u8]) -> FaultResult<usize> {
        self.sync_cap();

        if chunk.is_empty() {
            self.inner.flush().await?;
            return Ok(0);
        }

        let mut written = 0;
        while written < chunk.len() {
            let piece = self.limiter.max_grant(chunk.len() - written);
            self.limiter.acquire(piece).await;
            self.inner.write(&chunk[written..written + piece]).await?;
            self.inner.flush().await?;
            written += piece;
        }
        Ok(written)
    }

    async fn flush(&mut self) -> FaultResult<()> {
        self.inner.flush().await
    }
}
