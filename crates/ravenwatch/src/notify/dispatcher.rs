use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use super::{AlertRequest, AlertSink, DeliveryError};
use crate::config::NotificationSettings;
use crate::monitoring::MonitorStatus;
use crate::state::Transition;

/// Last alert sent for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRecord {
    pub last_notified_at: DateTime<Utc>,
    pub last_notified_status: MonitorStatus,
}

/// Turns transitions into alerts, at most one per device per cooldown
pub struct NotificationDispatcher {
    sink: Arc<dyn AlertSink>,
    cooldown: Duration,
    records: Mutex<HashMap<String, NotificationRecord>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>, cooldown: Duration) -> Self {
        Self { sink, cooldown, records: Mutex::new(HashMap::new()) }
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, NotificationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, device: &str) -> Option<NotificationRecord> {
        self.records().get(device).copied()
    }

    /// Pick the alerts to send at `now` and record them. Suppressed
    /// transitions are dropped.
    pub fn select_at(
        &self,
        transitions: &[Transition],
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) -> Vec<AlertRequest> {
        if !settings.is_active() {
            if transitions.iter().any(|t| t.notifications_enabled) {
                tracing::debug!(count = transitions.len(), "Notifications inactive, skipping alerts");
            }
            return Vec::new();
        }

        let mut records = self.records();
        let mut alerts = Vec::new();

        for transition in transitions.iter().filter(|t| t.notifications_enabled) {
            let Some(alert) = AlertRequest::from_transition(transition, now) else {
                continue;
            };

            if let Some(record) = records.get(&transition.device) {
                let elapsed = now - record.last_notified_at;
                if elapsed < self.cooldown {
                    tracing::info!(
                        device = %transition.device,
                        status = %transition.new_status,
                        remaining_secs = (self.cooldown - elapsed).num_seconds(),
                        "Alert suppressed by cooldown"
                    );
                    continue;
                }
            }

            records.insert(
                transition.device.clone(),
                NotificationRecord { last_notified_at: now, last_notified_status: transition.new_status },
            );
            alerts.push(alert);
        }

        alerts
    }

    /// Send alerts for this cycle's transitions. Delivery runs in the
    /// background; failures are logged and keep the cooldown record.
    pub fn dispatch(&self, transitions: &[Transition], settings: &NotificationSettings) -> Vec<JoinHandle<()>> {
        self.select_at(transitions, settings, Utc::now())
            .into_iter()
            .map(|alert| {
                let sink = self.sink.clone();
                let url = settings.webhook_url.clone();
                tokio::spawn(async move {
                    if let Err(e) = sink.send(&url, &alert).await {
                        tracing::error!(device = %alert.device, error = %e, "Alert delivery failed");
                    }
                })
            })
            .collect()
    }

    /// Send a sample alert now, ignoring cooldown and the enabled flag
    pub async fn send_test_alert(&self, settings: &NotificationSettings) -> Result<(), DeliveryError> {
        if !settings.has_webhook() {
            return Err(DeliveryError::NotConfigured);
        }
        self.sink.send(&settings.webhook_url, &AlertRequest::test(Utc::now())).await
    }

    /// Forget devices that no longer exist
    pub fn prune<'a>(&self, devices: impl IntoIterator<Item = &'a str>) {
        let present: HashSet<&str> = devices.into_iter().collect();
        self.records().retain(|name, _| present.contains(name.as_str()));
    }
}
