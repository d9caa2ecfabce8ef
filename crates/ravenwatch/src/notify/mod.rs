//! Alerting on device state changes.
//!
//! The [`NotificationDispatcher`] decides which transitions become alerts;
//! an [`AlertSink`] delivers them. [`TeamsWebhook`] is the shipped sink.

mod dispatcher;
mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::CheckType;
use crate::monitoring::MonitorStatus;
use crate::state::Transition;

pub use dispatcher::{NotificationDispatcher, NotificationRecord};
pub use webhook::TeamsWebhook;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    #[error("No webhook URL configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Down,
    Up,
    Test,
}

impl AlertKind {
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Down => "DOWN",
            AlertKind::Up => "UP",
            AlertKind::Test => "TEST",
        }
    }
}

/// One alert handed to a sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRequest {
    pub device: String,
    pub kind: AlertKind,
    pub check_type: Option<CheckType>,
    pub message: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AlertRequest {
    /// Alert for a transition into down or a recovery, `None` otherwise
    pub fn from_transition(transition: &Transition, timestamp: DateTime<Utc>) -> Option<Self> {
        let device = transition.device.clone();

        if transition.new_status == MonitorStatus::Down {
            let details = transition
                .failing_checks
                .iter()
                .map(|result| {
                    format!(
                        "{} {}: {}",
                        result.check_type.as_str().to_uppercase(),
                        result.target,
                        result.error.as_deref().unwrap_or("down")
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");

            Some(Self {
                message: format!("{device} is unreachable!"),
                check_type: transition.failing_checks.first().map(|result| result.check_type),
                details: (!details.is_empty()).then(|| format!("Error: {details}")),
                kind: AlertKind::Down,
                device,
                timestamp,
            })
        } else if transition.is_recovery() {
            Some(Self {
                message: format!("{device} is reachable again!"),
                check_type: None,
                details: Some("The device responds normally again.".to_string()),
                kind: AlertKind::Up,
                device,
                timestamp,
            })
        } else {
            None
        }
    }

    /// Sample alert for checking the webhook setup
    pub fn test(timestamp: DateTime<Utc>) -> Self {
        Self {
            device: "Test device".to_string(),
            kind: AlertKind::Test,
            check_type: None,
            message: format!("Test notification from {}", crate::APP_NAME),
            details: Some("Notifications are configured correctly.".to_string()),
            timestamp,
        }
    }
}

/// Delivers alerts to an external channel
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, webhook_url: &str, alert: &AlertRequest) -> Result<(), DeliveryError>;
}
