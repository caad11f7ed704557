//! Service tests for envbin
//!
//! This module contains tests for the response sinks and the throttled writer.

pub mod helpers;
