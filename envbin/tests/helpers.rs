//! Test helper utilities for envbin integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use tower::ServiceExt;

use envbin::{
    FaultResult, FaultServer, RequestPipeline, ResponseSink, TerminalHandler, ThreadRngSampler,
    core::{AllocationPool, SettingsStore},
};

/// Terminal handler writing a fixed payload in one call
pub struct StaticPayload(pub Vec<u8>);

#[async_trait]
impl TerminalHandler for StaticPayload {
    async fn serve(&self, sink: &mut dyn ResponseSink) -> FaultResult<()> {
        sink.write(&self.0).await?;
        Ok(())
    }
}

/// Exit code recorded by the test exit hook; `i32::MIN` until called
pub fn exit_recorder() -> Arc<AtomicI32> {
    Arc::new(AtomicI32::new(i32::MIN))
}

/// Server over fresh state answering the data path with `payload`
pub fn test_server(payload: Vec<u8>) -> (FaultServer<ThreadRngSampler, StaticPayload>, Arc<AtomicI32>) {
    let settings = Arc::new(SettingsStore::new());
    let pool = Arc::new(AllocationPool::new());
    let pipeline = RequestPipeline::new(settings.clone(), ThreadRngSampler::new(), StaticPayload(payload));

    let exit_code = exit_recorder();
    let recorded = exit_code.clone();
    let server = FaultServer::new(settings, pool, pipeline)
        .with_exit_hook(Arc::new(move |code| recorded.store(code, Ordering::SeqCst)));

    (server, exit_code)
}

/// Send one request through the router and collect the body as text
pub async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Payload of `len` recognizable bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

/// Helper to wait for async conditions with timeout
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        if condition().await {
            return true;
        }

        if start.elapsed() > timeout {
            return false;
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
