//! Shared utilities for the envbin fault-injection service
//!
//! Holds the pieces every binary and test harness in the workspace needs:
//! tracing setup, instance identity for log tagging and the shared error type.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
