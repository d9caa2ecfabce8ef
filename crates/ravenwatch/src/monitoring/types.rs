use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CheckType;

/// Status of a monitoring check or device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Unknown,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Kind of check that produced this result
    #[serde(rename = "type")]
    pub check_type: CheckType,

    /// Host, URL or group that was checked
    pub target: String,

    /// Timestamp when the check was performed
    pub timestamp: DateTime<Utc>,

    /// Up or down. Results are never unknown once a probe ran.
    pub status: MonitorStatus,

    /// Response time in milliseconds
    pub response_time_ms: Option<f64>,

    /// Human readable success details
    pub details: Option<String>,

    /// Human readable failure reason
    pub error: Option<String>,
}

impl CheckResult {
    /// Create a new check result
    pub fn new(check_type: CheckType, target: impl Into<String>) -> Self {
        Self {
            check_type,
            target: target.into(),
            timestamp: Utc::now(),
            status: MonitorStatus::Unknown,
            response_time_ms: None,
            details: None,
            error: None,
        }
    }

    /// Mark the check as successful
    pub fn success(mut self, details: impl Into<String>, response_time_ms: f64) -> Self {
        self.status = MonitorStatus::Up;
        self.details = Some(details.into());
        self.error = None;
        self.response_time_ms = Some(response_time_ms);
        self
    }

    /// Mark the check as failed with error
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.status = MonitorStatus::Down;
        self.error = Some(error.into());
        self.details = None;
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == MonitorStatus::Up
    }
}
