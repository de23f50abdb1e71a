//! Calc Scheduler - drives the change-detection cycle on a fixed tick
//!
//! The calculator lives behind a mutex shared with the host; every tick runs
//! [`Calculator::tick`] under the lock, so ticks never overlap and hosts see a
//! consistent calculator between ticks.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::calculator::Calculator;

/// Default scheduler tick interval (100ms)
pub const DEFAULT_TICK_MS: u64 = 100;

/// Snapshot of scheduler counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub running: bool,
    pub tick_ms: u64,
    /// Ticks completed, failed ones included
    pub ticks: u64,
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    errors: AtomicU64,
}

/// Periodic driver for one calculator
///
/// Dropping the scheduler stops the loop as [`stop`](Self::stop) does.
pub struct CalcScheduler {
    calculator: Arc<Mutex<Calculator>>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    tick_ms: u64,
    handle: Option<JoinHandle<()>>,
}

impl CalcScheduler {
    /// Take ownership of the calculator and start ticking at `options().tick_ms`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(calculator: Calculator) -> Self {
        let tick_ms = calculator.options().tick_ms.max(1);
        let calculator = Arc::new(Mutex::new(calculator));
        let shutdown = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        info!("Starting calculator scheduler with {}ms tick", tick_ms);
        let handle = tokio::spawn(run(
            calculator.clone(),
            shutdown.clone(),
            running.clone(),
            counters.clone(),
            tick_ms,
        ));

        Self {
            calculator,
            shutdown,
            running,
            counters,
            tick_ms,
            handle: Some(handle),
        }
    }

    /// Shared handle to the calculator
    pub fn calculator(&self) -> Arc<Mutex<Calculator>> {
        self.calculator.clone()
    }

    /// Run `f` with the calculator locked, between ticks
    pub fn with<T>(&self, f: impl FnOnce(&mut Calculator) -> T) -> T {
        f(&mut self.calculator.lock())
    }

    /// Request shutdown; the current tick, if any, completes first
    pub fn stop(&self) {
        info!("Stopping calculator scheduler...");
        self.shutdown.notify_one();
    }

    /// Wait for the loop to exit after [`stop`](Self::stop)
    pub async fn join(mut self) -> Result<(), JoinError> {
        match self.handle.take() {
            Some(handle) => handle.await,
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            tick_ms: self.tick_ms,
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

impl Drop for CalcScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown.notify_one();
        }
    }
}

async fn run(
    calculator: Arc<Mutex<Calculator>>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    tick_ms: u64,
) {
    let mut tick_interval = interval(Duration::from_millis(tick_ms));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let result = calculator.lock().tick();
                counters.ticks.fetch_add(1, Ordering::Relaxed);
                match result {
                    Ok(report) if report.evaluated() => {
                        debug!(
                            "Calculator evaluated {} results, {} inputs corrected",
                            report.outputs.len(),
                            report.corrected
                        );
                    },
                    Ok(_) => {},
                    Err(e) => {
                        counters.errors.fetch_add(1, Ordering::Relaxed);
                        error!("Calculator tick error: {}", e);
                    },
                }
            }
            _ = shutdown.notified() => {
                info!("Calculator scheduler received shutdown signal");
                break;
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    info!("Calculator scheduler stopped");
}
