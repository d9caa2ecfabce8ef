//! RAVENNA overview views, derived from the inventory and the latest snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RavennaSettings;
use crate::models::{CheckType, Device, Snapshot};
use crate::monitoring::MonitorStatus;

#[derive(Debug, Clone, Serialize)]
pub struct RavennaDevice {
    pub name: String,
    pub status: MonitorStatus,
    pub has_ptp: bool,
    pub has_multicast: bool,
    pub has_rtp: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RavennaOverview {
    /// Up iff every media device is up
    pub overall_status: MonitorStatus,
    pub total_ravenna_devices: usize,
    pub devices: Vec<RavennaDevice>,
    pub config: RavennaSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct PtpDevice {
    pub name: String,
    pub status: MonitorStatus,
    pub last_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PtpOverview {
    pub ptp_domain: u8,
    pub ptp_multicast: String,
    pub ptp_ports: Vec<u16>,
    pub devices: Vec<PtpDevice>,
    pub total_synced: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamDevice {
    pub name: String,
    pub status: MonitorStatus,
    pub has_rtp: bool,
    pub has_multicast: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamOverview {
    pub total_stream_devices: usize,
    pub devices: Vec<StreamDevice>,
    pub active_streams: usize,
}

pub fn ravenna_overview(devices: &[Device], snapshot: &Snapshot, settings: &RavennaSettings) -> RavennaOverview {
    let devices: Vec<RavennaDevice> = devices
        .iter()
        .map(|device| RavennaDevice {
            name: device.name.clone(),
            status: snapshot.device_status(&device.name),
            has_ptp: device.has_check_type(CheckType::Ptp),
            has_multicast: device.has_check_type(CheckType::Multicast),
            has_rtp: device.has_check_type(CheckType::Rtp),
        })
        .filter(|device| device.has_ptp || device.has_multicast || device.has_rtp)
        .collect();

    let all_up = devices.iter().all(|device| device.status == MonitorStatus::Up);

    RavennaOverview {
        overall_status: if all_up { MonitorStatus::Up } else { MonitorStatus::Down },
        total_ravenna_devices: devices.len(),
        devices,
        config: settings.clone(),
    }
}

pub fn ptp_overview(devices: &[Device], snapshot: &Snapshot, settings: &RavennaSettings) -> PtpOverview {
    let devices: Vec<PtpDevice> = devices
        .iter()
        .filter(|device| device.has_check_type(CheckType::Ptp))
        .map(|device| PtpDevice {
            name: device.name.clone(),
            status: snapshot.device_status(&device.name),
            last_check: snapshot.device(&device.name).and_then(|d| d.last_check),
        })
        .collect();

    PtpOverview {
        ptp_domain: settings.ptp_domain,
        ptp_multicast: settings.ptp_multicast.clone(),
        ptp_ports: settings.ptp_ports.clone(),
        total_synced: devices.iter().filter(|d| d.status == MonitorStatus::Up).count(),
        devices,
    }
}

pub fn stream_overview(devices: &[Device], snapshot: &Snapshot) -> StreamOverview {
    let devices: Vec<StreamDevice> = devices
        .iter()
        .map(|device| StreamDevice {
            name: device.name.clone(),
            status: snapshot.device_status(&device.name),
            has_rtp: device.has_check_type(CheckType::Rtp),
            has_multicast: device.has_check_type(CheckType::Multicast),
        })
        .filter(|device| device.has_rtp || device.has_multicast)
        .collect();

    StreamOverview {
        total_stream_devices: devices.len(),
        active_streams: devices.iter().filter(|d| d.status == MonitorStatus::Up).count(),
        devices,
    }
}
