use std::collections::HashSet;
use std::time::Duration;
use std::{fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DEFAULT_PTP_MULTICAST, DEFAULT_PTP_PORTS, Device};
use crate::monitoring::validation::validate_device;
use crate::registry::DocumentStore;
use crate::troubleshoot::{TroubleshootCategory, default_categories};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Placeholder URL prefix shipped in sample documents
const PLACEHOLDER_WEBHOOK: &str = "https://your-";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// The durable document: settings plus the device list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub troubleshooting: Vec<TroubleshootCategory>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Seconds between cycles
    pub check_interval: u64,
    /// Hard per-check timeout in seconds
    pub check_timeout: u64,
    pub failure_threshold: u32,
    /// Minimum seconds between two alerts for one device
    pub notification_cooldown: u64,
    pub max_concurrent_checks: usize,
    pub ravenna: RavennaSettings,
}

/// Media network parameters shown in the RAVENNA overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RavennaSettings {
    pub ptp_domain: u8,
    pub ptp_multicast: String,
    pub ptp_ports: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub webhook_url: String,
    pub enabled: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8000 }
    }
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            check_interval: 30,
            check_timeout: 5,
            failure_threshold: 2,
            notification_cooldown: 300,
            max_concurrent_checks: 64,
            ravenna: RavennaSettings::default(),
        }
    }
}

impl Default for RavennaSettings {
    fn default() -> Self {
        Self {
            ptp_domain: 0,
            ptp_multicast: DEFAULT_PTP_MULTICAST.into(),
            ptp_ports: DEFAULT_PTP_PORTS.to_vec(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { webhook_url: String::new(), enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            monitoring: MonitoringSettings::default(),
            notifications: NotificationSettings::default(),
            troubleshooting: default_categories(),
            devices: Vec::new(),
        }
    }
}

impl MonitoringSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.notification_cooldown).unwrap_or(i64::MAX))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval == 0 {
            return Err(ConfigError::Invalid("check_interval must be at least 1 second".into()));
        }
        if self.check_timeout == 0 {
            return Err(ConfigError::Invalid("check_timeout must be at least 1 second".into()));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid("failure_threshold must be at least 1".into()));
        }
        if self.max_concurrent_checks == 0 {
            return Err(ConfigError::Invalid("max_concurrent_checks must be at least 1".into()));
        }
        Ok(())
    }
}

impl NotificationSettings {
    /// A real webhook URL is configured
    pub fn has_webhook(&self) -> bool {
        let url = self.webhook_url.trim();
        !url.is_empty() && !url.starts_with(PLACEHOLDER_WEBHOOK)
    }

    /// Alerts should be delivered
    pub fn is_active(&self) -> bool {
        self.enabled && self.has_webhook()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let monitoring = &self.monitoring;
        let webhook = if self.notifications.has_webhook() { "configured" } else { "not configured" };

        writeln!(f, "Current Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.host)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Monitoring")?;
        write_1(f, "Check Interval (s)", &monitoring.check_interval)?;
        write_1(f, "Check Timeout (s)", &monitoring.check_timeout)?;
        write_1(f, "Failure Threshold", &monitoring.failure_threshold)?;
        write_1(f, "Notification Cooldown (s)", &monitoring.notification_cooldown)?;
        write_1(f, "Max Concurrent Checks", &monitoring.max_concurrent_checks)?;
        write_title_1(f, "Notifications")?;
        write_1(f, "Enabled", &self.notifications.enabled)?;
        write_1(f, "Webhook", &webhook)?;
        write_title_1(f, "Inventory")?;
        write_1(f, "Devices", &self.devices.len())?;
        write_1(f, "Troubleshooting Categories", &self.troubleshooting.len())?;

        Ok(())
    }
}

/// Document layout with devices kept raw, so one bad entry does not reject
/// the whole file
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    monitoring: MonitoringSettings,
    #[serde(default)]
    notifications: NotificationSettings,
    #[serde(default)]
    troubleshooting: Vec<TroubleshootCategory>,
    #[serde(default)]
    devices: Vec<toml::Value>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

impl Config {
    /// Parse a document, skipping devices that are malformed, invalid or
    /// duplicated
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(raw)?;
        raw.monitoring.validate()?;

        let mut seen = HashSet::new();
        let mut devices = Vec::with_capacity(raw.devices.len());

        for (idx, value) in raw.devices.into_iter().enumerate() {
            let device: Device = match value.try_into() {
                Ok(device) => device,
                Err(e) => {
                    tracing::warn!(index = idx, error = %e, "Skipping malformed device entry");
                    continue;
                }
            };
            if let Err(e) = validate_device(&device) {
                tracing::warn!(device = %device.name, error = %e, "Skipping invalid device");
                continue;
            }
            if !seen.insert(device.name.clone()) {
                tracing::warn!(device = %device.name, "Skipping duplicate device");
                continue;
            }
            devices.push(device);
        }

        Ok(Self {
            server: raw.server,
            monitoring: raw.monitoring,
            notifications: raw.notifications,
            troubleshooting: raw.troubleshooting,
            devices,
        })
    }

    /// Generate Config structure from file
    ///
    /// Creates a default document at the given path if none exists.
    pub fn from_config(path: impl AsRef<path::Path>) -> Result<Self, ConfigError> {
        let config_path = normalize_toml_path(path.as_ref());

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Self::parse(&raw_string)
        } else {
            tracing::info!(path = %config_path.display(), "Config not found, writing defaults");
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file. The document is written next
    /// to the target and renamed over it.
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str = toml::to_string_pretty(self)?;
        let write_failed = |source| ConfigError::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, config_str).map_err(write_failed)?;
        fs::rename(&tmp_path, path).map_err(write_failed)
    }
}

/// The config document on disk
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: path::PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl AsRef<path::Path>) -> Self {
        Self { path: normalize_toml_path(path.as_ref()) }
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::from_config(&self.path)
    }
}

impl DocumentStore for ConfigFile {
    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.write_config(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckKind;

    const SAMPLE: &str = r#"
[monitoring]
check_interval = 10
failure_threshold = 3

[notifications]
webhook_url = "https://your-tenant.webhook.office.com/xyz"

[[devices]]
name = "Stagebox"

[[devices.checks]]
type = "ping"
target = "10.0.0.5"
tags = ["connection"]

[[devices.checks]]
type = "port"
host = "10.0.0.5"
port = 80

[[devices]]
name = "Broken"

[[devices.checks]]
type = "snmp"
host = "10.0.0.6"

[[devices]]
name = "Stagebox"
checks = []

[[devices]]
name = "NoPorts"

[[devices.checks]]
type = "port"
host = "10.0.0.7"
ports = []
"#;

    #[test]
    fn test_parse_skips_bad_devices_and_keeps_defaults() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.monitoring.check_interval, 10);
        assert_eq!(config.monitoring.failure_threshold, 3);
        assert_eq!(config.monitoring.notification_cooldown, 300);
        assert_eq!(config.server.port, 8000);

        assert_eq!(config.devices.len(), 1);
        let device = &config.devices[0];
        assert_eq!(device.name, "Stagebox");
        assert!(device.notifications_enabled);
        assert_eq!(device.checks[1].kind, CheckKind::Port { host: "10.0.0.5".into(), ports: vec![80] });
    }

    #[test]
    fn test_placeholder_webhook_is_not_active() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(config.notifications.enabled);
        assert!(!config.notifications.has_webhook());
        assert!(!config.notifications.is_active());

        let real = NotificationSettings { webhook_url: "https://example.test/hook".into(), enabled: false };
        assert!(real.has_webhook());
        assert!(!real.is_active());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let err = Config::parse("[monitoring]\nfailure_threshold = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::from_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, Config::default());
        assert!(!config.troubleshooting.is_empty());

        let reloaded = Config::from_config(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_save_round_trips_devices() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::new(dir.path().join("config"));
        assert!(file.path().ends_with("config.toml"));

        let mut config = Config::default();
        config.devices.push(Device::from_host("cam", "10.0.0.5", vec![80, 443], false));
        file.save(&config).unwrap();

        let loaded = file.load().unwrap();
        assert_eq!(loaded.devices, config.devices);
        assert!(!dir.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn test_display_lists_sections() {
        let rendered = Config::default().to_string();
        assert!(rendered.contains("Monitoring"));
        assert!(rendered.contains("Failure Threshold: 2"));
        assert!(rendered.contains("Webhook: not configured"));
    }
}
