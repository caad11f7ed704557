//! Command line configuration

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::core::{SettingsStore, UNLIMITED_BANDWIDTH};
use crate::error::{FaultError, FaultResult};

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "envbin")]
#[command(about = "HTTP service that misbehaves on command: latency, throttling, errors, CPU and memory pressure")]
#[command(version)]
pub struct Args {
    /// Address to bind the HTTP listener to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the HTTP listener
    #[arg(long, default_value = "8088")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Length of one CPU load duty cycle, in milliseconds
    #[arg(long, default_value = "1000")]
    pub cpu_period_ms: u64,

    /// Initial delay before the first byte, in seconds
    #[arg(long, default_value = "0")]
    pub delay: u64,

    /// Initial bandwidth cap in bytes per second (0 or absent means unlimited)
    #[arg(long)]
    pub bandwidth: Option<u64>,

    /// Initial probability of answering with a server error
    #[arg(long, default_value = "0.0")]
    pub error_rate: f64,

    /// Initial CPU load target, in cores
    #[arg(long, default_value = "0.0")]
    pub cpu: f64,
}

/// Fault settings applied at startup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialFaults {
    pub delay_seconds: u64,
    pub bandwidth_cap: u64,
    pub error_rate: f64,
    pub cpu_target: f64,
}

impl Default for InitialFaults {
    fn default() -> Self {
        Self {
            delay_seconds: 0,
            bandwidth_cap: UNLIMITED_BANDWIDTH,
            error_rate: 0.0,
            cpu_target: 0.0,
        }
    }
}

impl InitialFaults {
    pub fn apply_to(&self, settings: &SettingsStore) {
        settings.set_delay_seconds(self.delay_seconds);
        settings.set_bandwidth_cap(self.bandwidth_cap);
        settings.set_error_rate(self.error_rate);
        settings.set_cpu_target(self.cpu_target);
    }
}

/// Validated server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub cpu_period: Duration,
    pub initial: InitialFaults,
}

impl Args {
    pub fn into_config(self) -> FaultResult<ServerConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| FaultError::Config(format!("Invalid bind address {}: {}", self.bind, e)))?;

        if self.cpu_period_ms == 0 {
            return Err(FaultError::Config("CPU period must be greater than zero".to_string()));
        }

        Ok(ServerConfig {
            listen_addr: SocketAddr::new(ip, self.port),
            cpu_period: Duration::from_millis(self.cpu_period_ms),
            initial: InitialFaults {
                delay_seconds: self.delay,
                bandwidth_cap: self.bandwidth.unwrap_or(UNLIMITED_BANDWIDTH),
                error_rate: self.error_rate,
                cpu_target: self.cpu,
            },
        })
    }
}
