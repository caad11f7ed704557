//! envbin: an HTTP service that misbehaves on command
//!
//! Latency, bandwidth caps, injected server errors, CPU load and memory
//! pressure can all be switched at runtime through the `/api` control routes,
//! while every other request is answered through the fault pipeline.

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod server_impl;
pub mod services;
pub mod traits;
pub mod web;

// Re-export main types
pub use config::{Args, InitialFaults, ServerConfig};
pub use error::{FaultError, FaultResult};
pub use pipeline::{RequestPipeline, STANDARD_STAGES, Stage, Verdict};
pub use server_impl::{ExitHook, FaultServer};

// Re-export trait definitions
pub use traits::{FaultSampler, ResponseSink, TerminalHandler};

// Re-export service implementations
pub use services::{ChannelSink, StatusPage, ThreadRngSampler, ThrottledWriter};
