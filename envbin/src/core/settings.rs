//! Live fault settings shared by control handlers, the request pipeline and
//! the CPU load workers
//!
//! Every field is its own atomic cell. Reads and writes of one field are
//! well defined, but nothing makes a read of several fields consistent: a
//! request may see a new bandwidth together with an old delay. Fault
//! injection is approximate, so this is accepted.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{FaultError, FaultResult};

/// Bandwidth value meaning "no cap"
pub const UNLIMITED_BANDWIDTH: u64 = u64::MAX;

/// A runtime-adjustable fault setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Delay,
    Bandwidth,
    ErrorRate,
    CpuTarget,
    Health,
    Liveness,
}

impl Setting {
    pub const ALL: [Setting; 6] = [
        Setting::Delay,
        Setting::Bandwidth,
        Setting::ErrorRate,
        Setting::CpuTarget,
        Setting::Health,
        Setting::Liveness,
    ];

    /// Name used in control routes and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Setting::Delay => "delay",
            Setting::Bandwidth => "bandwidth",
            Setting::ErrorRate => "errorrate",
            Setting::CpuTarget => "cpu",
            Setting::Health => "health",
            Setting::Liveness => "liveness",
        }
    }

    /// Parse a raw control input into a value of this setting's type
    pub fn parse_value(&self, raw: &str) -> FaultResult<SettingValue> {
        let name = self.name();
        match self {
            Setting::Delay => raw
                .parse::<u64>()
                .map(SettingValue::Seconds)
                .map_err(|e| FaultError::parse(name, raw, e)),
            Setting::Bandwidth => raw
                .parse::<u64>()
                .map(SettingValue::BytesPerSecond)
                .map_err(|e| FaultError::parse(name, raw, e)),
            Setting::ErrorRate => raw
                .parse::<f64>()
                .map(SettingValue::Ratio)
                .map_err(|e| FaultError::parse(name, raw, e)),
            Setting::CpuTarget => raw
                .parse::<f64>()
                .map(SettingValue::Cores)
                .map_err(|e| FaultError::parse(name, raw, e)),
            Setting::Health | Setting::Liveness => parse_flag(raw)
                .map(SettingValue::Flag)
                .ok_or_else(|| FaultError::parse(name, raw, "expected a boolean")),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the usual spellings: 1/t/true and 0/f/false in lower, upper or title case
fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// A typed setting value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Seconds(u64),
    BytesPerSecond(u64),
    Ratio(f64),
    Cores(f64),
    Flag(bool),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Seconds(v) | SettingValue::BytesPerSecond(v) => write!(f, "{v}"),
            SettingValue::Ratio(v) | SettingValue::Cores(v) => write!(f, "{v}"),
            SettingValue::Flag(v) => write!(f, "{v}"),
        }
    }
}

/// Point-in-time copy of every field, not guaranteed to be consistent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    pub delay_seconds: u64,
    pub bandwidth_cap: u64,
    pub error_rate: f64,
    pub cpu_target: f64,
    pub healthy: bool,
    pub live: bool,
}

/// Shared mutable fault settings
#[derive(Debug)]
pub struct SettingsStore {
    delay_seconds: AtomicU64,
    bandwidth_cap: AtomicU64,
    error_rate: AtomicU64,
    cpu_target: AtomicU64,
    healthy: AtomicBool,
    live: AtomicBool,
}

impl SettingsStore {
    /// Create a store with safe defaults: no delay, unlimited bandwidth, no errors
    pub fn new() -> Self {
        Self {
            delay_seconds: AtomicU64::new(0),
            bandwidth_cap: AtomicU64::new(UNLIMITED_BANDWIDTH),
            error_rate: AtomicU64::new(0f64.to_bits()),
            cpu_target: AtomicU64::new(0f64.to_bits()),
            healthy: AtomicBool::new(true),
            live: AtomicBool::new(true),
        }
    }

    pub fn delay_seconds(&self) -> u64 {
        self.delay_seconds.load(Ordering::Relaxed)
    }

    pub fn set_delay_seconds(&self, seconds: u64) {
        self.delay_seconds.store(seconds, Ordering::Relaxed);
    }

    pub fn bandwidth_cap(&self) -> u64 {
        self.bandwidth_cap.load(Ordering::Relaxed)
    }

    pub fn set_bandwidth_cap(&self, bytes_per_sec: u64) {
        self.bandwidth_cap.store(bytes_per_sec, Ordering::Relaxed);
    }

    pub fn error_rate(&self) -> f64 {
        f64::from_bits(self.error_rate.load(Ordering::Relaxed))
    }

    pub fn set_error_rate(&self, rate: f64) {
        self.error_rate.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub fn cpu_target(&self) -> f64 {
        f64::from_bits(self.cpu_target.load(Ordering::Relaxed))
    }

    pub fn set_cpu_target(&self, cores: f64) {
        self.cpu_target.store(cores.to_bits(), Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Relaxed);
    }

    /// Read one setting
    pub fn get(&self, setting: Setting) -> SettingValue {
        match setting {
            Setting::Delay => SettingValue::Seconds(self.delay_seconds()),
            Setting::Bandwidth => SettingValue::BytesPerSecond(self.bandwidth_cap()),
            Setting::ErrorRate => SettingValue::Ratio(self.error_rate()),
            Setting::CpuTarget => SettingValue::Cores(self.cpu_target()),
            Setting::Health => SettingValue::Flag(self.is_healthy()),
            Setting::Liveness => SettingValue::Flag(self.is_live()),
        }
    }

    /// Parse `raw` and overwrite `setting` with it.
    ///
    /// On a parse failure the store is left untouched.
    pub fn apply(&self, setting: Setting, raw: &str) -> FaultResult<SettingValue> {
        let value = setting.parse_value(raw)?;
        match value {
            SettingValue::Seconds(v) => self.set_delay_seconds(v),
            SettingValue::BytesPerSecond(v) => self.set_bandwidth_cap(v),
            SettingValue::Ratio(v) => self.set_error_rate(v),
            SettingValue::Cores(v) => self.set_cpu_target(v),
            SettingValue::Flag(v) if setting == Setting::Health => self.set_healthy(v),
            SettingValue::Flag(v) => self.set_live(v),
        }
        Ok(value)
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            delay_seconds: self.delay_seconds(),
            bandwidth_cap: self.bandwidth_cap(),
            error_rate: self.error_rate(),
            cpu_target: self.cpu_target(),
            healthy: self.is_healthy(),
            live: self.is_live(),
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_defaults_are_safe() {
        let store = SettingsStore::new();
        let snapshot = store.snapshot();

        assert_eq!(snapshot.delay_seconds, 0);
        assert_eq!(snapshot.bandwidth_cap, UNLIMITED_BANDWIDTH);
        assert_eq!(snapshot.error_rate, 0.0);
        assert_eq!(snapshot.cpu_target, 0.0);
        assert!(snapshot.healthy);
        assert!(snapshot.live);
    }

    #[test]
    fn test_apply_returns_new_value() {
        let store = SettingsStore::new();

        assert_eq!(store.apply(Setting::Delay, "3").unwrap(), SettingValue::Seconds(3));
        assert_eq!(
            store.apply(Setting::Bandwidth, "1000").unwrap(),
            SettingValue::BytesPerSecond(1000)
        );
        assert_eq!(store.apply(Setting::ErrorRate, "0.25").unwrap(), SettingValue::Ratio(0.25));
        assert_eq!(store.apply(Setting::CpuTarget, "2.5").unwrap(), SettingValue::Cores(2.5));
        assert_eq!(store.apply(Setting::Health, "false").unwrap(), SettingValue::Flag(false));
        assert_eq!(store.apply(Setting::Liveness, "F").unwrap(), SettingValue::Flag(false));

        assert_eq!(store.delay_seconds(), 3);
        assert_eq!(store.bandwidth_cap(), 1000);
        assert_eq!(store.error_rate(), 0.25);
        assert_eq!(store.cpu_target(), 2.5);
        assert!(!store.is_healthy());
        assert!(!store.is_live());
    }

    #[test]
    fn test_malformed_input_leaves_store_unchanged() {
        let store = SettingsStore::new();
        store.apply(Setting::Delay, "7").unwrap();
        store.apply(Setting::ErrorRate, "0.5").unwrap();

        for (setting, raw) in [
            (Setting::Delay, "soon"),
            (Setting::Delay, "-1"),
            (Setting::Bandwidth, "1.5"),
            (Setting::ErrorRate, "half"),
            (Setting::CpuTarget, ""),
            (Setting::Health, "yes"),
            (Setting::Liveness, "2"),
        ] {
            let err = store.apply(setting, raw).unwrap_err();
            match err {
                FaultError::Parse { setting: name, value, .. } => {
                    assert_eq!(name, setting.name());
                    assert_eq!(value, raw);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(store.get(Setting::Delay), SettingValue::Seconds(7));
        assert_eq!(store.get(Setting::ErrorRate), SettingValue::Ratio(0.5));
        assert_eq!(store.bandwidth_cap(), UNLIMITED_BANDWIDTH);
        assert!(store.is_healthy());
        assert!(store.is_live());
    }

    #[test]
    fn test_pathological_values_are_accepted() {
        let store = SettingsStore::new();

        store.apply(Setting::Delay, &u64::MAX.to_string()).unwrap();
        store.apply(Setting::Bandwidth, "0").unwrap();
        store.apply(Setting::ErrorRate, "7.5").unwrap();
        store.apply(Setting::CpuTarget, "100000").unwrap();

        assert_eq!(store.delay_seconds(), u64::MAX);
        assert_eq!(store.bandwidth_cap(), 0);
        assert_eq!(store.error_rate(), 7.5);
        assert_eq!(store.cpu_target(), 100000.0);
    }

    #[test]
    fn test_last_write_wins() {
        let store = SettingsStore::new();
        store.apply(Setting::Delay, "1").unwrap();
        store.apply(Setting::Delay, "9").unwrap();
        store.apply(Setting::Delay, "4").unwrap();
        assert_eq!(store.delay_seconds(), 4);
    }

    #[test]
    fn test_concurrent_writers_leave_a_written_value() {
        let store = Arc::new(SettingsStore::new());

        let handles: Vec<_> = (1..=8u64)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        store.set_bandwidth_cap(i * 100);
                        let _ = store.bandwidth_cap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let cap = store.bandwidth_cap();
        assert!(cap % 100 == 0 && (100..=800).contains(&cap));
    }

    #[test]
    fn test_setting_value_display() {
        assert_eq!(SettingValue::Seconds(5).to_string(), "5");
        assert_eq!(SettingValue::Ratio(0.5).to_string(), "0.5");
        assert_eq!(SettingValue::Flag(true).to_string(), "true");
    }
}
