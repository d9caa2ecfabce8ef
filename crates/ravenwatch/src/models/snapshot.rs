//! Published view of the latest monitoring cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check::CheckType;
use super::device::Device;
use crate::monitoring::MonitorStatus;

const PENDING_DETAILS: &str = "Waiting for first check...";

/// Every device with its aggregate status and per-check results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of the cycle that produced this snapshot, 0 before the first one
    pub cycle: u64,
    pub generated_at: Option<DateTime<Utc>>,
    pub total_devices: usize,
    pub devices: Vec<DeviceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub name: String,
    pub status: MonitorStatus,
    pub previous_status: MonitorStatus,
    /// Longest failure streak among the device's checks
    pub consecutive_failures: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub notifications_enabled: bool,
    pub checks: Vec<CheckSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSnapshot {
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub target: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Debounced status
    pub status: MonitorStatus,
    /// Status of the latest probe, before debouncing
    pub result: MonitorStatus,
    pub consecutive_failures: u32,
    pub response_time_ms: Option<f64>,
    pub details: Option<String>,
    pub error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Placeholder published before the first cycle completes
    pub fn pending(devices: &[Device]) -> Self {
        let devices: Vec<DeviceSnapshot> = devices
            .iter()
            .map(|device| DeviceSnapshot {
                name: device.name.clone(),
                status: MonitorStatus::Unknown,
                previous_status: MonitorStatus::Unknown,
                consecutive_failures: 0,
                last_check: None,
                notifications_enabled: device.notifications_enabled,
                checks: device
                    .checks
                    .iter()
                    .map(|check| CheckSnapshot {
                        check_type: check.check_type(),
                        target: check.target(),
                        description: check.description.clone(),
                        tags: check.tags.clone(),
                        status: MonitorStatus::Unknown,
                        result: MonitorStatus::Unknown,
                        consecutive_failures: 0,
                        response_time_ms: None,
                        details: Some(PENDING_DETAILS.to_string()),
                        error: None,
                        timestamp: None,
                    })
                    .collect(),
            })
            .collect();

        Self { cycle: 0, generated_at: None, total_devices: devices.len(), devices }
    }

    pub fn device(&self, name: &str) -> Option<&DeviceSnapshot> {
        self.devices.iter().find(|device| device.name == name)
    }

    pub fn device_status(&self, name: &str) -> MonitorStatus {
        self.device(name).map_or(MonitorStatus::Unknown, |device| device.status)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
