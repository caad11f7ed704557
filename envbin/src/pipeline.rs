//! Request pipeline wrapping the terminal handler with fault stages
//!
//! Stages run in list order: error injection, then latency, then bandwidth.
//! A rejected request therefore never pays for the delay or the throttle.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shared::InstanceId;

use crate::core::SettingsStore;
use crate::error::FaultResult;
use crate::services::{ChannelSink, ThrottledWriter};
use crate::traits::{FaultSampler, ResponseSink, TerminalHandler};

/// One fault stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reject with 500 when a uniform sample falls below the error rate
    ErrorInjection,
    /// Sleep for the configured delay before anything is sent
    Latency,
    /// Route the body through a ThrottledWriter
    Bandwidth,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ErrorInjection => write!(f, "error-injection"),
            Stage::Latency => write!(f, "latency"),
            Stage::Bandwidth => write!(f, "bandwidth"),
        }
    }
}

/// The fixed production order
pub const STANDARD_STAGES: [Stage; 3] = [Stage::ErrorInjection, Stage::Latency, Stage::Bandwidth];

/// Result of running the fault stages for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Answered with an injected server error
    Rejected,
    /// Passed on to the terminal handler
    Forwarded { throttled: bool },
}

pub struct RequestPipeline<R, H> {
    stages: Vec<Stage>,
    settings: Arc<SettingsStore>,
    sampler: R,
    handler: Arc<H>,
}

impl<R, H> RequestPipeline<R, H>
where
    R: FaultSampler,
    H: TerminalHandler + 'static,
{
    /// Pipeline with the standard stage order
    pub fn new(settings: Arc<SettingsStore>, sampler: R, handler: H) -> Self {
        Self::with_stages(STANDARD_STAGES.to_vec(), settings, sampler, handler)
    }

    pub fn with_stages(stages: Vec<Stage>, settings: Arc<SettingsStore>, sampler: R, handler: H) -> Self {
        Self {
            stages,
            settings,
            sampler,
            handler: Arc::new(handler),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order, stopping at the first rejection
    pub async fn evaluate(&self) -> Verdict {
        let mut throttled = false;

        for stage in &self.stages {
            match stage {
                Stage::ErrorInjection => {
                    let rate = self.settings.error_rate();
                    let sample = self.sampler.sample();
                    if sample < rate {
                        shared::instance_debug!(
                            InstanceId::current(),
                            "💥 injected server error (sample {:.4} < rate {})",
                            sample,
                            rate
                        );
                        return Verdict::Rejected;
                    }
                }
                Stage::Latency => {
                    let delay = self.settings.delay_seconds();
                    if delay > 0 {
                        tokio::time::sleep(Duration::from_secs(delay)).await;
                    }
                }
                Stage::Bandwidth => throttled = true,
            }
        }

        Verdict::Forwarded { throttled }
    }

    /// Handle one data-path request
    pub async fn dispatch(&self) -> Response {
        let throttled = match self.evaluate().await {
            Verdict::Rejected => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Verdict::Forwarded { throttled } => throttled,
        };

        let (sink, body) = ChannelSink::with_body();
        let handler = self.handler.clone();
        let settings = self.settings.clone();

        tokio::spawn(async move {
            if throttled {
                let mut writer = ThrottledWriter::new(sink, settings);
                let result = serve_and_flush(handler.as_ref(), &mut writer).await;
                finish(writer.into_inner(), result).await;
            } else {
                let mut sink = sink;
                let result = serve_and_flush(handler.as_ref(), &mut sink).await;
                finish(sink, result).await;
            }
        });

        let mut response = Response::new(body);
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.handler.content_type()),
        );
        response
    }
}

async fn serve_and_flush<H>(handler: &H, sink: &mut dyn ResponseSink) -> FaultResult<()>
where
    H: TerminalHandler + ?Sized,
{
    handler.serve(sink).await?;
    sink.flush().await
}

/// A failed response is cut short; the rest of the process carries on
async fn finish(sink: ChannelSink, result: FaultResult<()>) {
    if let Err(e) = result {
        shared::instance_warn!(InstanceId::current(), "⚠️ response aborted: {}", e);
        sink.abort(&e).await;
    }
}
