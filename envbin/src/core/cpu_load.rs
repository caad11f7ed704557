//! CPU duty-cycle generator
//!
//! One OS thread per logical processing unit. Every period each worker reads
//! the CPU target, spins for its share of the period and sleeps until the
//! next period boundary. A target of `2.5` on an 8-unit host makes every
//! worker busy for 2.5 / 8 of each period, roughly two and a half cores in
//! aggregate.
//!
//! Measured utilisation overshoots or undershoots the target by about 10%
//! depending on scheduler and sampling granularity. Targets above the unit
//! count saturate every worker; the excess is ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use shared::InstanceId;

use crate::core::settings::SettingsStore;
use crate::error::FaultResult;

/// Length of one high/low cycle
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Fraction of each period a single worker spends busy
pub fn duty_cycle(target: f64, units: usize) -> f64 {
    if units == 0 || target.is_nan() || target <= 0.0 {
        return 0.0;
    }
    let units = units as f64;
    target.min(units) / units
}

/// Number of logical processing units visible to this process
pub fn available_units() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// The per-unit spin/idle loop
#[derive(Debug, Clone)]
pub struct DutyCycleWorker {
    settings: Arc<SettingsStore>,
    units: usize,
    period: Duration,
}

impl DutyCycleWorker {
    pub fn new(settings: Arc<SettingsStore>, units: usize, period: Duration) -> Self {
        Self {
            settings,
            units,
            period,
        }
    }

    /// Run the high phase of one period ending at `period_end`.
    ///
    /// Returns how long the worker actually spun.
    pub fn run_period(&self, period_end: Instant) -> Duration {
        let started = Instant::now();
        let duty = duty_cycle(self.settings.cpu_target(), self.units);
        if duty <= 0.0 {
            return Duration::ZERO;
        }

        let high_end = started + self.period.mul_f64(duty);
        let deadline = high_end.min(period_end);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
        started.elapsed()
    }

    /// Alternate high and low phases until `stop` is raised.
    ///
    /// Returns the number of periods run.
    pub fn run(&self, stop: &AtomicBool) -> u64 {
        let mut periods = 0;
        let mut next_tick = Instant::now() + self.period;
        while !stop.load(Ordering::Relaxed) {
            self.run_period(next_tick);
            periods += 1;

            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            }

            // Ticks missed during an overlong high phase are dropped
            let now = Instant::now();
            while next_tick <= now {
                next_tick += self.period;
            }
        }
        periods
    }
}

/// Spawns the duty-cycle workers
pub struct CpuLoadGenerator {
    settings: Arc<SettingsStore>,
    units: usize,
    period: Duration,
}

impl CpuLoadGenerator {
    /// Create a generator covering every available unit
    pub fn new(settings: Arc<SettingsStore>, period: Duration) -> Self {
        Self::with_units(settings, available_units(), period)
    }

    pub fn with_units(settings: Arc<SettingsStore>, units: usize, period: Duration) -> Self {
        Self {
            settings,
            units: units.max(1),
            period,
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Start one worker thread per unit
    pub fn start(self) -> FaultResult<CpuLoadHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(self.units);

        for index in 0..self.units {
            let worker = DutyCycleWorker::new(self.settings.clone(), self.units, self.period);
            let stop = stop.clone();
            let handle = thread::Builder::new()
                .name(format!("cpu-load-{index}"))
                .spawn(move || {
                    worker.run(&stop);
                })?;
            workers.push(handle);
        }

        shared::instance_info!(
            InstanceId::current(),
            "🔥 CPU load generator running {} workers with a {:?} period",
            self.units,
            self.period
        );

        Ok(CpuLoadHandle { stop, workers })
    }
}

/// Running workers. Dropping the handle leaves them running.
pub struct CpuLoadHandle {
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl CpuLoadHandle {
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Ask every worker to exit after its current period
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stop and join every worker; blocks for up to one period
    pub fn shutdown(self) {
        self.request_stop();
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}
