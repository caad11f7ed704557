//! Core fault-simulation state and algorithms
//!
//! No HTTP here: settings, rate limiting, CPU duty cycles and the memory pool.

pub mod allocation;
pub mod cpu_load;
pub mod rate_limiter;
pub mod settings;

// Re-export commonly used types
pub use allocation::{AllocationPool, PoolStats};
pub use cpu_load::{CpuLoadGenerator, CpuLoadHandle, DutyCycleWorker};
pub use rate_limiter::RateLimiter;
pub use settings::{Setting, SettingValue, SettingsSnapshot, SettingsStore, UNLIMITED_BANDWIDTH};
