//! Test helpers for service tests

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

use crate::core::SettingsStore;
use crate::error::FaultResult;
use crate::traits::ResponseSink;

/// Sink that records every write with the (possibly paused) time it arrived
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub writes: Vec<(Instant, Vec<u8>)>,
    pub flushes: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.writes.iter().flat_map(|(_, chunk)| chunk.iter().copied()).collect()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn write(&mut self, chunk: &[u8]) -> FaultResult<usize> {
        self.writes.push((Instant::now(), chunk.to_vec()));
        Ok(chunk.len())
    }

    async fn flush(&mut self) -> FaultResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Sink without flush support
#[derive(Debug, Default)]
pub struct UnflushableSink {
    pub written: usize,
}

#[async_trait]
impl ResponseSink for UnflushableSink {
    async fn write(&mut self, chunk: &[u8]) -> FaultResult<usize> {
        self.written += chunk.len();
        Ok(chunk.len())
    }
}

/// Settings store with a bandwidth cap applied
pub fn settings_with_cap(cap: u64) -> Arc<SettingsStore> {
    let settings = Arc::new(SettingsStore::new());
    settings.set_bandwidth_cap(cap);
    settings
}

/// Deterministic payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
