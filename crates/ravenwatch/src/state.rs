//! Per-check debouncing and per-device aggregation.
//!
//! A check only turns visibly down after `failure_threshold` consecutive down
//! results; one up result brings it back. Devices are down as soon as one
//! check is visibly down and up once every check is visibly up.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Check, CheckSnapshot, Device, DeviceSnapshot, Snapshot};
use crate::monitoring::{CheckResult, DeviceResults, MonitorStatus};

#[derive(Debug, Clone)]
struct CheckState {
    /// Definition the state belongs to, a different definition starts over
    check: Check,
    consecutive_failures: u32,
    visible: Option<MonitorStatus>,
    last_result: Option<CheckResult>,
}

impl CheckState {
    fn new(check: Check) -> Self {
        Self { check, consecutive_failures: 0, visible: None, last_result: None }
    }

    fn record(&mut self, result: &CheckResult, failure_threshold: u32) {
        if result.is_up() {
            self.consecutive_failures = 0;
            self.visible = Some(MonitorStatus::Up);
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if self.consecutive_failures >= failure_threshold {
                self.visible = Some(MonitorStatus::Down);
            }
        }
        self.last_result = Some(result.clone());
    }
}

/// Device status change between two consecutive cycles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub device: String,
    pub previous_status: MonitorStatus,
    pub new_status: MonitorStatus,
    /// Latest down results of the device's checks
    pub failing_checks: Vec<CheckResult>,
    pub notifications_enabled: bool,
}

impl Transition {
    pub fn is_recovery(&self) -> bool {
        self.previous_status == MonitorStatus::Down && self.new_status == MonitorStatus::Up
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    BecameDown,
    BecameUp,
    StillDown,
    StillUp,
    /// No aggregate yet
    Pending,
}

impl DeviceOutcome {
    fn classify(previous: MonitorStatus, current: MonitorStatus) -> Self {
        match (previous, current) {
            (MonitorStatus::Down, MonitorStatus::Down) => DeviceOutcome::StillDown,
            (_, MonitorStatus::Down) => DeviceOutcome::BecameDown,
            (MonitorStatus::Up, MonitorStatus::Up) => DeviceOutcome::StillUp,
            (_, MonitorStatus::Up) => DeviceOutcome::BecameUp,
            (_, MonitorStatus::Unknown) => DeviceOutcome::Pending,
        }
    }
}

/// Everything one cycle produced
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub snapshot: Snapshot,
    pub transitions: Vec<Transition>,
    pub outcomes: Vec<(String, DeviceOutcome)>,
}

impl CycleOutcome {
    pub fn count(&self, outcome: DeviceOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Owns every check state and device aggregate
#[derive(Debug)]
pub struct StateTracker {
    failure_threshold: u32,
    checks: HashMap<(String, usize), CheckState>,
    devices: HashMap<String, MonitorStatus>,
    cycle: u64,
}

impl StateTracker {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            checks: HashMap::new(),
            devices: HashMap::new(),
            cycle: 0,
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Aggregate status of a device, unknown before its first aggregate
    pub fn device_status(&self, name: &str) -> MonitorStatus {
        self.devices.get(name).copied().unwrap_or(MonitorStatus::Unknown)
    }

    /// Failure streak of one check
    pub fn consecutive_failures(&self, device: &str, check_idx: usize) -> u32 {
        self.checks
            .get(&(device.to_string(), check_idx))
            .map_or(0, |state| state.consecutive_failures)
    }

    /// Fold one cycle's results into the tracked state.
    ///
    /// `devices` is the registry copy the cycle ran against. State of devices
    /// and checks that are no longer part of it is discarded.
    pub fn apply(&mut self, devices: &[Device], results: &[DeviceResults]) -> CycleOutcome {
        self.cycle += 1;
        let threshold = self.failure_threshold;
        let by_device: HashMap<&str, &DeviceResults> =
            results.iter().map(|r| (r.device.as_str(), r)).collect();

        let mut snapshots = Vec::with_capacity(devices.len());
        let mut transitions = Vec::new();
        let mut outcomes = Vec::with_capacity(devices.len());

        for device in devices {
            let device_results = by_device.get(device.name.as_str()).map(|r| r.results.as_slice());

            for (idx, check) in device.checks.iter().enumerate() {
                let state = self.check_state(&device.name, idx, check);
                if let Some(result) = device_results.and_then(|results| results.get(idx)) {
                    state.record(result, threshold);
                }
            }

            let previous = self.device_status(&device.name);
            let current = self.aggregate(device, previous);
            self.devices.insert(device.name.clone(), current);

            if current != previous {
                transitions.push(Transition {
                    device: device.name.clone(),
                    previous_status: previous,
                    new_status: current,
                    failing_checks: self.failing_checks(device),
                    notifications_enabled: device.notifications_enabled,
                });
            }
            outcomes.push((device.name.clone(), DeviceOutcome::classify(previous, current)));
            snapshots.push(self.device_snapshot(device, previous, current));
        }

        self.prune(devices);

        let snapshot = Snapshot {
            cycle: self.cycle,
            generated_at: Some(Utc::now()),
            total_devices: snapshots.len(),
            devices: snapshots,
        };

        CycleOutcome { snapshot, transitions, outcomes }
    }

    fn check_state(&mut self, device: &str, idx: usize, check: &Check) -> &mut CheckState {
        let state = self
            .checks
            .entry((device.to_string(), idx))
            .or_insert_with(|| CheckState::new(check.clone()));
        if state.check != *check {
            *state = CheckState::new(check.clone());
        }
        state
    }

    fn states<'a>(&'a self, device: &'a Device) -> impl Iterator<Item = Option<&'a CheckState>> + 'a {
        (0..device.checks.len()).map(move |idx| self.checks.get(&(device.name.clone(), idx)))
    }

    fn aggregate(&self, device: &Device, previous: MonitorStatus) -> MonitorStatus {
        if device.checks.is_empty() {
            return MonitorStatus::Up;
        }

        let visible: Vec<Option<MonitorStatus>> =
            self.states(device).map(|state| state.and_then(|s| s.visible)).collect();

        if visible.contains(&Some(MonitorStatus::Down)) {
            MonitorStatus::Down
        } else if visible.iter().all(|v| *v == Some(MonitorStatus::Up)) {
            MonitorStatus::Up
        } else {
            previous
        }
    }

    fn failing_checks(&self, device: &Device) -> Vec<CheckResult> {
        self.states(device)
            .flatten()
            .filter_map(|state| state.last_result.as_ref())
            .filter(|result| !result.is_up())
            .cloned()
            .collect()
    }

    fn device_snapshot(
        &self,
        device: &Device,
        previous: MonitorStatus,
        current: MonitorStatus,
    ) -> DeviceSnapshot {
        let mut last_check: Option<DateTime<Utc>> = None;
        let mut consecutive_failures = 0;

        let checks = device
            .checks
            .iter()
            .zip(self.states(device))
            .map(|(check, state)| {
                let result = state.and_then(|s| s.last_result.as_ref());
                let failures = state.map_or(0, |s| s.consecutive_failures);
                consecutive_failures = consecutive_failures.max(failures);
                if let Some(result) = result {
                    last_check = last_check.max(Some(result.timestamp));
                }

                CheckSnapshot {
                    check_type: check.check_type(),
                    target: check.target(),
                    description: check.description.clone(),
                    tags: check.tags.clone(),
                    status: state.and_then(|s| s.visible).unwrap_or(MonitorStatus::Unknown),
                    result: result.map_or(MonitorStatus::Unknown, |r| r.status),
                    consecutive_failures: failures,
                    response_time_ms: result.and_then(|r| r.response_time_ms),
                    details: result.and_then(|r| r.details.clone()),
                    error: result.and_then(|r| r.error.clone()),
                    timestamp: result.map(|r| r.timestamp),
                }
            })
            .collect();

        DeviceSnapshot {
            name: device.name.clone(),
            status: current,
            previous_status: previous,
            consecutive_failures,
            last_check,
            notifications_enabled: device.notifications_enabled,
            checks,
        }
    }

    fn prune(&mut self, devices: &[Device]) {
        let present: HashMap<&str, usize> =
            devices.iter().map(|d| (d.name.as_str(), d.checks.len())).collect();

        self.checks.retain(|(device, idx), _| present.get(device.as_str()).is_some_and(|len| idx < len));

        let names: HashSet<&str> = present.keys().copied().collect();
        self.devices.retain(|name, _| names.contains(name.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckKind, CheckType};

    fn ping(target: &str) -> Check {
        Check::new(CheckKind::Ping { target: target.to_string() })
    }

    fn result(up: bool) -> CheckResult {
        let result = CheckResult::new(CheckType::Ping, "10.0.0.5");
        if up { result.success("ok", 1.0) } else { result.failure("timeout") }
    }

    fn cycle(tracker: &mut StateTracker, devices: &[Device], outcome: &[&[bool]]) -> CycleOutcome {
        let results: Vec<DeviceResults> = devices
            .iter()
            .zip(outcome)
            .map(|(device, ups)| DeviceResults {
                device: device.name.clone(),
                results: ups.iter().map(|up| result(*up)).collect(),
            })
            .collect();
        tracker.apply(devices, &results)
    }

    #[test]
    fn test_threshold_debounces_single_failure() {
        let devices = vec![Device::new("cam", vec![ping("10.0.0.5")])];
        let mut tracker = StateTracker::new(2);

        let first = cycle(&mut tracker, &devices, &[&[false]]);
        assert_eq!(first.snapshot.devices[0].status, MonitorStatus::Unknown);
        assert_eq!(first.snapshot.devices[0].checks[0].result, MonitorStatus::Down);
        assert_eq!(first.outcomes[0].1, DeviceOutcome::Pending);
        assert!(first.transitions.is_empty());

        let second = cycle(&mut tracker, &devices, &[&[true]]);
        assert_eq!(second.snapshot.devices[0].status, MonitorStatus::Up);
        assert_eq!(tracker.consecutive_failures("cam", 0), 0);
        assert_eq!(second.transitions.len(), 1);
        assert_eq!(second.transitions[0].previous_status, MonitorStatus::Unknown);
        assert!(!second.transitions[0].is_recovery());
    }

    #[test]
    fn test_down_after_threshold_and_recovery() {
        let devices = vec![Device::new("cam", vec![ping("10.0.0.5")])];
        let mut tracker = StateTracker::new(2);

        cycle(&mut tracker, &devices, &[&[true]]);
        let one = cycle(&mut tracker, &devices, &[&[false]]);
        assert_eq!(one.snapshot.devices[0].status, MonitorStatus::Up);
        assert_eq!(one.outcomes[0].1, DeviceOutcome::StillUp);

        let two = cycle(&mut tracker, &devices, &[&[false]]);
        assert_eq!(two.snapshot.devices[0].status, MonitorStatus::Down);
        assert_eq!(two.snapshot.devices[0].consecutive_failures, 2);
        assert_eq!(two.outcomes[0].1, DeviceOutcome::BecameDown);
        assert_eq!(two.transitions[0].failing_checks.len(), 1);

        let three = cycle(&mut tracker, &devices, &[&[false]]);
        assert!(three.transitions.is_empty());
        assert_eq!(three.count(DeviceOutcome::StillDown), 1);

        let back = cycle(&mut tracker, &devices, &[&[true]]);
        assert!(back.transitions[0].is_recovery());
        assert_eq!(back.snapshot.devices[0].previous_status, MonitorStatus::Down);
    }

    #[test]
    fn test_any_visible_down_check_downs_the_device() {
        let devices = vec![Device::new("core", vec![ping("a"), ping("b")])];
        let mut tracker = StateTracker::new(1);

        let outcome = cycle(&mut tracker, &devices, &[&[true, false]]);
        let device = &outcome.snapshot.devices[0];
        assert_eq!(device.status, MonitorStatus::Down);
        assert_eq!(device.checks[0].status, MonitorStatus::Up);
        assert_eq!(device.checks[1].status, MonitorStatus::Down);
        assert_eq!(device.checks[1].error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_device_without_checks_is_up() {
        let devices = vec![Device::new("empty", vec![])];
        let mut tracker = StateTracker::new(2);

        let outcome = cycle(&mut tracker, &devices, &[&[]]);
        assert_eq!(outcome.snapshot.devices[0].status, MonitorStatus::Up);
    }

    #[test]
    fn test_edited_check_and_removed_device_lose_state() {
        let mut devices = vec![
            Device::new("cam", vec![ping("10.0.0.5")]),
            Device::new("mixer", vec![ping("10.0.0.6")]),
        ];
        let mut tracker = StateTracker::new(3);

        cycle(&mut tracker, &devices, &[&[false], &[false]]);
        assert_eq!(tracker.consecutive_failures("cam", 0), 1);

        devices[0].checks[0] = ping("10.0.0.50");
        devices.pop();
        cycle(&mut tracker, &devices, &[&[false]]);

        assert_eq!(tracker.consecutive_failures("cam", 0), 1);
        assert_eq!(tracker.consecutive_failures("mixer", 0), 0);
        assert_eq!(tracker.device_status("mixer"), MonitorStatus::Unknown);
    }

    #[test]
    fn test_notification_flag_does_not_change_tracking() {
        let loud = vec![Device::new("cam", vec![ping("10.0.0.5")])];
        let quiet = vec![Device::new("cam", vec![ping("10.0.0.5")]).with_notifications(false)];
        let mut a = StateTracker::new(2);
        let mut b = StateTracker::new(2);

        for ups in [[true], [false], [false], [true]] {
            let x = cycle(&mut a, &loud, &[&ups]);
            let y = cycle(&mut b, &quiet, &[&ups]);
            assert_eq!(x.outcomes, y.outcomes);
            assert_eq!(x.transitions.len(), y.transitions.len());
        }
        assert!(!cycle(&mut b, &quiet, &[&[false]]).snapshot.devices[0].notifications_enabled);
    }
}
