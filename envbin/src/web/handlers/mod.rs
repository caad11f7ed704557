//! Request handlers
//!
//! Thin adapters between axum extractors and the settings store, the
//! allocation pool and the request pipeline.

pub mod control;
pub mod listing;
pub mod probes;
