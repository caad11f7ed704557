//! Status page served at the end of the request pipeline
//!
//! Reports host facts, process facts and the current fault settings as plain
//! text. The text is written in small chunks so bandwidth throttling shows up
//! as a steadily growing page instead of one late burst.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::net::{IpAddr, UdpSocket};
use std::sync::Arc;
use sysinfo::System;

use crate::core::{AllocationPool, PoolStats, SettingsSnapshot, SettingsStore};
use crate::error::{FaultError, FaultResult};
use crate::traits::{ResponseSink, TerminalHandler};

/// Size of each write into the response sink
pub const STATUS_CHUNK_SIZE: usize = 64;

/// Host and process facts gathered for one page render
#[derive(Debug, Clone)]
pub struct HostReport {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub os_uptime_secs: u64,
    pub arch: String,
    pub cpu_brand: String,
    pub logical_cores: usize,
    pub mem_total_bytes: u64,
    pub process_memory_bytes: Option<u64>,
    pub process_virtual_bytes: Option<u64>,
    pub process_count: usize,
    pub pid: u32,
    pub default_ip: Option<IpAddr>,
}

impl HostReport {
    /// Collect a report; slow enough that async callers should use a blocking thread
    pub fn collect() -> Self {
        let sys = System::new_all();
        let own = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid));

        Self {
            hostname: System::host_name().unwrap_or_else(|| "<unknown>".to_string()),
            os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::os_version().unwrap_or_else(|| "<unknown>".to_string()),
            os_uptime_secs: System::uptime(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_brand: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .unwrap_or_default(),
            logical_cores: sys.cpus().len(),
            mem_total_bytes: sys.total_memory(),
            process_memory_bytes: own.map(|p| p.memory()),
            process_virtual_bytes: own.map(|p| p.virtual_memory()),
            process_count: sys.processes().len(),
            pid: std::process::id(),
            default_ip: default_outbound_ip(),
        }
    }
}

/// Address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only asks the kernel for a route.
pub fn default_outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:53").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Whole gibibytes, rounded down
pub fn format_gib(bytes: u64) -> String {
    format!("{}G", bytes >> 30)
}

/// Seconds as `Nd HH:MM:SS`
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
}

fn format_bandwidth(cap: u64) -> String {
    if cap == 0 || cap == u64::MAX {
        "unlimited".to_string()
    } else {
        format!("{cap} bytes/s")
    }
}

/// Render the page text
pub fn render_status(
    version: &str,
    started_at: DateTime<Utc>,
    host: &HostReport,
    settings: &SettingsSnapshot,
    pool: &PoolStats,
) -> String {
    let mut out = String::with_capacity(1024);
    let unknown = || "<unknown>".to_string();

    // Writing into a String cannot fail
    let _ = writeln!(out, "envbin {version}");
    let _ = writeln!(out, "Started:          {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Host");
    let _ = writeln!(out, "  Hostname:       {}", host.hostname);
    let _ = writeln!(out, "  IP:             {}", host.default_ip.map(|ip| ip.to_string()).unwrap_or_else(unknown));
    let _ = writeln!(out, "  OS:             {} {}", host.os_name, host.os_version);
    let _ = writeln!(out, "  OS uptime:      {}", format_uptime(host.os_uptime_secs));
    let _ = writeln!(out, "  Arch:           {}", host.arch);
    let _ = writeln!(out, "  CPU:            {}", host.cpu_brand);
    let _ = writeln!(out, "  Logical cores:  {}", host.logical_cores);
    let _ = writeln!(out, "  Memory:         {}", format_gib(host.mem_total_bytes));
    let _ = writeln!(out, "  Processes:      {}", host.process_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "Process");
    let _ = writeln!(out, "  Pid:            {}", host.pid);
    let _ = writeln!(out, "  Resident:       {}", host.process_memory_bytes.map(|b| format!("{b} bytes")).unwrap_or_else(unknown));
    let _ = writeln!(out, "  Virtual:        {}", host.process_virtual_bytes.map(|b| format!("{b} bytes")).unwrap_or_else(unknown));
    let _ = writeln!(out, "  Allocated pool: {} bytes in {} blocks", pool.total_bytes, pool.blocks);
    let _ = writeln!(out);
    let _ = writeln!(out, "Settings");
    let _ = writeln!(out, "  Health:         {}", settings.healthy);
    let _ = writeln!(out, "  Liveness:       {}", settings.live);
    let _ = writeln!(out, "  Latency:        {}s", settings.delay_seconds);
    let _ = writeln!(out, "  Bandwidth:      {}", format_bandwidth(settings.bandwidth_cap));
    let _ = writeln!(out, "  Error rate:     {}", settings.error_rate);
    let _ = writeln!(out, "  CPU target:     {}", settings.cpu_target);
    out
}

/// Terminal handler rendering the status page
pub struct StatusPage {
    settings: Arc<SettingsStore>,
    pool: Arc<AllocationPool>,
    started_at: DateTime<Utc>,
}

impl StatusPage {
    pub fn new(settings: Arc<SettingsStore>, pool: Arc<AllocationPool>, started_at: DateTime<Utc>) -> Self {
        Self {
            settings,
            pool,
            started_at,
        }
    }
}

#[async_trait]
impl TerminalHandler for StatusPage {
    async fn serve(&self, sink: &mut dyn ResponseSink) -> FaultResult<()> {
        let host = tokio::task::spawn_blocking(HostReport::collect)
            .await
            .map_err(|e| FaultError::Status(e.to_string()))?;

        let page = render_status(
            env!("CARGO_PKG_VERSION"),
            self.started_at,
            &host,
            &self.settings.snapshot(),
            &self.pool.stats(),
        );

        for chunk in page.as_bytes().chunks(STATUS_CHUNK_SIZE) {
            sink.write(chunk).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_host() -> HostReport {
        HostReport {
            hostname: "node-7".to_string(),
            os_name: "Linux".to_string(),
            os_version: "6.1".to_string(),
            os_uptime_secs: 90_061,
            arch: "x86_64".to_string(),
            cpu_brand: "Test CPU".to_string(),
            logical_cores: 8,
            mem_total_bytes: 16 << 30,
            process_memory_bytes: Some(2048),
            process_virtual_bytes: None,
            process_count: 120,
            pid: 4242,
            default_ip: Some("10.0.0.5".parse().unwrap()),
        }
    }

    #[test]
    fn test_render_includes_settings_and_host() {
        let settings = SettingsStore::new();
        settings.set_delay_seconds(3);
        settings.set_bandwidth_cap(1000);
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let pool = PoolStats { blocks: 2, total_bytes: 4096 };

        let page = render_status("1.2.3", started, &sample_host(), &settings.snapshot(), &pool);

        assert!(page.starts_with("envbin 1.2.3\n"));
        assert!(page.contains("2024-05-01 12:30:00"));
        assert!(page.contains("node-7"));
        assert!(page.contains("10.0.0.5"));
        assert!(page.contains("Memory:         16G"));
        assert!(page.contains("OS uptime:      1d 01:01:01"));
        assert!(page.contains("Latency:        3s"));
        assert!(page.contains("Bandwidth:      1000 bytes/s"));
        assert!(page.contains("4096 bytes in 2 blocks"));
        assert!(page.contains("Virtual:        <unknown>"));
    }

    #[test]
    fn test_render_reports_unlimited_bandwidth() {
        let settings = SettingsStore::new();
        let page = render_status(
            "0.1.0",
            Utc::now(),
            &sample_host(),
            &settings.snapshot(),
            &PoolStats { blocks: 0, total_bytes: 0 },
        );
        assert!(page.contains("Bandwidth:      unlimited"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_gib(3 << 30), "3G");
        assert_eq!(format_gib((1 << 30) - 1), "0G");
        assert_eq!(format_uptime(59), "0d 00:00:59");
        assert_eq!(format_uptime(3_661), "0d 01:01:01");
    }
}
