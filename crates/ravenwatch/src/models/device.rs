use serde::{Deserialize, Serialize};

use super::check::{Check, CheckKind};

/// A monitored device. The name is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,

    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    #[serde(default)]
    pub checks: Vec<Check>,
}

impl Device {
    pub fn new(name: impl Into<String>, checks: Vec<Check>) -> Self {
        Self { name: name.into(), notifications_enabled: true, checks }
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Standard check set for a device created from the management surface:
    /// a reachability ping plus one port check covering every listed port.
    pub fn from_host(
        name: impl Into<String>,
        host: &str,
        ports: Vec<u16>,
        notifications_enabled: bool,
    ) -> Self {
        let ping = Check::new(CheckKind::Ping { target: host.to_string() })
            .with_tags(["connection", "ping"]);
        let description = match ports.as_slice() {
            [port] => format!("Port {port}"),
            _ => "Ports".to_string(),
        };
        let ports = Check::new(CheckKind::Port { host: host.to_string(), ports })
            .with_description(description)
            .with_tags(["app"]);

        Self { name: name.into(), notifications_enabled, checks: vec![ping, ports] }
    }

    pub fn has_check_type(&self, check_type: super::CheckType) -> bool {
        self.checks.iter().any(|check| check.check_type() == check_type)
    }
}

fn default_true() -> bool {
    true
}
