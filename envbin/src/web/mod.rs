//! HTTP surface: control routes, probes and the API listing

pub mod handlers;
