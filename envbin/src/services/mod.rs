//! Service implementations
//!
//! Real implementations of the service traits for production use

pub mod channel_sink;
pub mod sampler;
pub mod status_page;
pub mod throttled_writer;

#[cfg(test)]
mod tests;

// Re-export service implementations
pub use channel_sink::{BodyChunk, ChannelSink, body_from_channel};
pub use sampler::ThreadRngSampler;
pub use status_page::{HostReport, StatusPage};
pub use throttled_writer::ThrottledWriter;
