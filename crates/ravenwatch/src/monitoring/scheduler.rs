use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::engine::MonitoringEngine;

/// Single-flight flag shared by the periodic timer and run-now
#[derive(Debug, Default)]
pub struct CycleGuard {
    running: Arc<AtomicBool>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, `None` while another cycle holds it
    pub fn try_begin(&self) -> Option<CyclePermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit { running: self.running.clone() })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the duration of one cycle, releases the guard on drop
#[derive(Debug)]
pub struct CyclePermit {
    running: Arc<AtomicBool>,
}

impl Drop for CyclePermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Outcome of a run-now request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunNow {
    Started,
    AlreadyRunning,
}

/// Monitoring scheduler - fires a cycle every check interval
pub struct MonitoringScheduler {
    engine: Arc<MonitoringEngine>,
    interval: Duration,
    phase_reset: Arc<Notify>,
    shutdown: CancellationToken,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler, stopped by cancelling `shutdown`
    pub fn new(engine: Arc<MonitoringEngine>, shutdown: CancellationToken) -> Self {
        let interval = engine.check_interval();
        Self { engine, interval, phase_reset: Arc::new(Notify::new()), shutdown }
    }

    /// Handle for triggering cycles outside the timer
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle { engine: self.engine.clone(), phase_reset: self.phase_reset.clone() }
    }

    /// Run the timer loop on its own task
    pub fn spawn(self) -> (SchedulerHandle, JoinHandle<()>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Monitoring scheduler started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Monitoring scheduler stopped");
                    break;
                }
                _ = self.phase_reset.notified() => {
                    ticker.reset();
                }
                _ = ticker.tick() => {
                    start_cycle(&self.engine, "interval");
                }
            }
        }
    }
}

/// Cloneable trigger shared with the HTTP layer
#[derive(Clone)]
pub struct SchedulerHandle {
    engine: Arc<MonitoringEngine>,
    phase_reset: Arc<Notify>,
}

impl SchedulerHandle {
    /// Start a cycle immediately unless one is running. Never waits for the
    /// cycle to finish.
    pub fn run_now(&self) -> RunNow {
        let outcome = start_cycle(&self.engine, "manual");
        if outcome == RunNow::Started {
            self.phase_reset.notify_one();
        }
        outcome
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_cycle_running()
    }
}

fn start_cycle(engine: &Arc<MonitoringEngine>, trigger: &'static str) -> RunNow {
    match engine.try_begin_cycle() {
        Some(permit) => {
            tracing::debug!(trigger, "Starting monitoring cycle");
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_cycle(permit).await });
            RunNow::Started
        }
        None => {
            tracing::info!(trigger, "Monitoring cycle still running, skipping");
            RunNow::AlreadyRunning
        }
    }
}
