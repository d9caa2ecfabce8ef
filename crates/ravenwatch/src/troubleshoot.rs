//! On-demand runs of a tagged subset of checks.
//!
//! Troubleshooting results are returned to the caller only. They never feed
//! the state tracker, the status store or the notification dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Check, Device};
use crate::monitoring::{CheckResult, CheckRunner, MonitorStatus, execute_cycle};

/// Named group of check tags offered to operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroubleshootCategory {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub check_tags: Vec<String>,
}

impl TroubleshootCategory {
    pub fn new(id: &str, name: &str, description: &str, tags: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            check_tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

/// Categories written into a freshly created document
pub fn default_categories() -> Vec<TroubleshootCategory> {
    vec![
        TroubleshootCategory::new("connection", "Connectivity", "Ping every device", &["connection", "ping"]),
        TroubleshootCategory::new("app", "Applications", "Check service ports", &["app"]),
        TroubleshootCategory::new(
            "media",
            "Media network",
            "PTP, multicast and RTP checks",
            &["ptp", "multicast", "rtp"],
        ),
    ]
}

/// One category run: the category as configured and what its checks found
#[derive(Debug, Clone, Serialize)]
pub struct TroubleshootRun {
    pub category: TroubleshootCategory,
    pub results: TroubleshootReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TroubleshootReport {
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Devices that ran at least one check
    pub devices: Vec<TroubleshootDevice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TroubleshootDevice {
    pub name: String,
    /// Up if every selected check passed, no debouncing applied
    pub status: MonitorStatus,
    pub checks: Vec<CheckResult>,
}

/// Only the checks carrying one of `tags`, devices without such checks are left out
pub fn select(devices: &[Device], tags: &[String]) -> Vec<Device> {
    devices
        .iter()
        .filter_map(|device| {
            let checks: Vec<Check> =
                device.checks.iter().filter(|check| check.has_any_tag(tags)).cloned().collect();
            (!checks.is_empty()).then(|| Device { checks, ..device.clone() })
        })
        .collect()
}

pub async fn run(
    runner: Arc<dyn CheckRunner>,
    devices: &[Device],
    tags: &[String],
    timeout: Duration,
    max_concurrent: usize,
) -> TroubleshootReport {
    let selected = select(devices, tags);
    tracing::info!(tags = ?tags, devices = selected.len(), "Running troubleshooting checks");

    let devices = execute_cycle(runner, &selected, timeout, max_concurrent)
        .await
        .into_iter()
        .map(|device| TroubleshootDevice {
            status: if device.results.iter().all(CheckResult::is_up) {
                MonitorStatus::Up
            } else {
                MonitorStatus::Down
            },
            name: device.device,
            checks: device.results,
        })
        .collect();

    TroubleshootReport { timestamp: Utc::now(), tags: tags.to_vec(), devices }
}
