//! Shared logging utilities for consistent tracing across the service

use crate::errors::{SharedError, SharedResult};
use crate::types::InstanceId;
use chrono::{DateTime, Utc};
use tracing::{error, info};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Build the filter directive for the given base level
pub fn filter_directive(log_level: &str) -> SharedResult<String> {
    let base_level = log_level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&base_level.as_str()) {
        return Err(SharedError::InvalidLogLevel {
            level: log_level.to_string(),
        });
    }

    Ok(format!(
        "envbin={base_level},shared={base_level},tower_http={base_level},axum={base_level}"
    ))
}

/// Initialize tracing subscriber with the given log level
pub fn init_tracing_with_level(log_level: Option<&str>) -> SharedResult<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let directive = filter_directive(log_level.unwrap_or("info"))?;

    fmt()
        .with_env_filter(EnvFilter::new(&directive))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .map_err(|e| SharedError::TracingInit { message: e.to_string() })?;

    info!("📊 Log level: {directive}");
    Ok(())
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for instance-aware info logging
#[macro_export]
macro_rules! instance_info {
    ($instance:expr, $($arg:tt)*) => {
        tracing::info!(
            instance = %$instance,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for instance-aware warning logging
#[macro_export]
macro_rules! instance_warn {
    ($instance:expr, $($arg:tt)*) => {
        tracing::warn!(
            instance = %$instance,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for instance-aware error logging
#[macro_export]
macro_rules! instance_error {
    ($instance:expr, $($arg:tt)*) => {
        tracing::error!(
            instance = %$instance,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for instance-aware debug logging
#[macro_export]
macro_rules! instance_debug {
    ($instance:expr, $($arg:tt)*) => {
        tracing::debug!(
            instance = %$instance,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(instance: &InstanceId, details: &str) {
    info!(
        instance = %instance,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(instance: &InstanceId, reason: &str) {
    info!(
        instance = %instance,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(instance: &InstanceId, context: &str, error: &dyn std::fmt::Display) {
    error!(
        instance = %instance,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(instance: &InstanceId, message: &str) {
    info!(
        instance = %instance,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
