//! The monitoring engine: owns the inventory, the per-check state, the
//! dispatcher and the published snapshot, and runs one cycle end to end.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::broadcast::{Broadcaster, StatusStore, Subscription};
use crate::config::{MonitoringSettings, RavennaSettings};
use crate::models::Snapshot;
use crate::monitoring::{CheckRunner, CycleGuard, CyclePermit, MonitorStatus, execute_cycle};
use crate::notify::{AlertSink, DeliveryError, NotificationDispatcher};
use crate::registry::DeviceRegistry;
use crate::state::{DeviceOutcome, StateTracker};
use crate::summary::{self, PtpOverview, RavennaOverview, StreamOverview};
use crate::troubleshoot::{self, TroubleshootCategory, TroubleshootReport, TroubleshootRun};

pub struct MonitoringEngine {
    registry: DeviceRegistry,
    runner: Arc<dyn CheckRunner>,
    settings: MonitoringSettings,
    tracker: Mutex<StateTracker>,
    dispatcher: NotificationDispatcher,
    store: StatusStore,
    broadcaster: Broadcaster,
    guard: CycleGuard,
}

impl MonitoringEngine {
    /// Monitoring settings are taken from the registry's document once; the
    /// store starts with every device pending.
    pub fn new(registry: DeviceRegistry, runner: Arc<dyn CheckRunner>, sink: Arc<dyn AlertSink>) -> Self {
        let settings = registry.monitoring_settings();
        let store = StatusStore::new(Snapshot::pending(&registry.devices()));

        Self {
            tracker: Mutex::new(StateTracker::new(settings.failure_threshold)),
            dispatcher: NotificationDispatcher::new(sink, settings.cooldown()),
            registry,
            runner,
            settings,
            store,
            broadcaster: Broadcaster::new(),
            guard: CycleGuard::new(),
        }
    }

    fn tracker(&self) -> MutexGuard<'_, StateTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &MonitoringSettings {
        &self.settings
    }

    pub fn check_interval(&self) -> Duration {
        self.settings.interval()
    }

    pub fn try_begin_cycle(&self) -> Option<CyclePermit> {
        self.guard.try_begin()
    }

    pub fn is_cycle_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.get()
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe(&self.store)
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// Run one complete cycle while holding `permit`.
    ///
    /// The cycle sees the device list as it was when it started; mutations
    /// made meanwhile show up in the next cycle.
    pub async fn run_cycle(&self, permit: CyclePermit) -> Arc<Snapshot> {
        let _permit = permit;
        let started = Instant::now();
        let devices = self.registry.devices();
        let checks: usize = devices.iter().map(|device| device.checks.len()).sum();

        self.broadcaster.checking_started();

        let results = execute_cycle(
            self.runner.clone(),
            &devices,
            self.settings.timeout(),
            self.settings.max_concurrent_checks,
        )
        .await;

        let outcome = self.tracker().apply(&devices, &results);
        let became_down = outcome.count(DeviceOutcome::BecameDown);
        let became_up = outcome.count(DeviceOutcome::BecameUp);
        let snapshot = Arc::new(outcome.snapshot);
        self.store.replace(snapshot.clone());

        for transition in &outcome.transitions {
            tracing::info!(
                device = %transition.device,
                from = %transition.previous_status,
                to = %transition.new_status,
                failing = transition.failing_checks.len(),
                "Device status changed"
            );
        }

        self.dispatcher.dispatch(&outcome.transitions, &self.registry.notification_settings());
        self.dispatcher.prune(devices.iter().map(|device| device.name.as_str()));

        self.broadcaster.status_update(snapshot.clone());

        let down = snapshot.devices.iter().filter(|d| d.status == MonitorStatus::Down).count();
        tracing::info!(
            cycle = snapshot.cycle,
            devices = devices.len(),
            checks,
            down,
            became_down,
            became_up,
            elapsed_ms = saturating_millis(started.elapsed()),
            "Monitoring cycle complete"
        );

        snapshot
    }

    pub fn troubleshooting_options(&self) -> Vec<TroubleshootCategory> {
        self.registry.troubleshooting()
    }

    /// Run the checks of one troubleshooting category, `None` if the
    /// category does not exist
    pub async fn troubleshoot(&self, category_id: &str) -> Option<TroubleshootRun> {
        let category =
            self.registry.troubleshooting().into_iter().find(|category| category.id == category_id)?;
        let results = self.troubleshoot_tags(&category.check_tags).await;
        Some(TroubleshootRun { category, results })
    }

    pub async fn troubleshoot_tags(&self, tags: &[String]) -> TroubleshootReport {
        troubleshoot::run(
            self.runner.clone(),
            &self.registry.devices(),
            tags,
            self.settings.timeout(),
            self.settings.max_concurrent_checks,
        )
        .await
    }

    pub async fn send_test_alert(&self) -> Result<(), DeliveryError> {
        let settings = self.registry.notification_settings();
        let outcome = self.dispatcher.send_test_alert(&settings).await;
        match &outcome {
            Ok(()) => tracing::info!("Test notification sent"),
            Err(e) => tracing::warn!(error = %e, "Test notification failed"),
        }
        outcome
    }

    pub fn ravenna_settings(&self) -> &RavennaSettings {
        &self.settings.ravenna
    }

    pub fn ravenna_overview(&self) -> RavennaOverview {
        summary::ravenna_overview(&self.registry.devices(), &self.snapshot(), self.ravenna_settings())
    }

    pub fn ptp_overview(&self) -> PtpOverview {
        summary::ptp_overview(&self.registry.devices(), &self.snapshot(), self.ravenna_settings())
    }

    pub fn stream_overview(&self) -> StreamOverview {
        summary::stream_overview(&self.registry.devices(), &self.snapshot())
    }
}

fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }
}
