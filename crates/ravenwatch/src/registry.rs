//! Mutable device inventory backed by the durable document.
//!
//! Every mutation works on a copy of the document, persists the copy and only
//! then swaps it in. A failed write leaves memory and disk untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use thiserror::Error;

use crate::config::{Config, ConfigError, MonitoringSettings, NotificationSettings};
use crate::models::Device;
use crate::monitoring::validation::{ValidationError, validate_device, validate_name, validate_ports};
use crate::troubleshoot::TroubleshootCategory;

/// Persists the whole document
pub trait DocumentStore: Send + Sync {
    fn save(&self, config: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Device '{0}' not found")]
    NotFound(String),

    #[error("Failed to persist configuration: {0}")]
    Persistence(#[from] ConfigError),
}

/// Add-device request from the management surface
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub host: String,
    pub ports: Vec<i64>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

/// Update request. The check set is rebuilt from `host` and `ports`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceUpdate {
    #[serde(default)]
    pub new_name: Option<String>,
    pub host: String,
    pub ports: Vec<i64>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

pub struct DeviceRegistry {
    store: Arc<dyn DocumentStore>,
    document: Mutex<Config>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, document: Config) -> Self {
        Self { store, document: Mutex::new(document) }
    }

    fn document(&self) -> MutexGuard<'_, Config> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy, persist it and swap it in. The write is
    /// synchronous and holds the document lock, so async callers run
    /// mutations on a blocking thread.
    fn mutate<T, F>(&self, change: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut Config) -> Result<T, RegistryError>,
    {
        let mut document = self.document();
        let mut draft = document.clone();
        let value = change(&mut draft)?;
        self.store.save(&draft)?;
        *document = draft;
        Ok(value)
    }

    /// Copy of the device list, as the next cycle will see it
    pub fn devices(&self) -> Vec<Device> {
        self.document().devices.clone()
    }

    pub fn device(&self, name: &str) -> Option<Device> {
        self.document().devices.iter().find(|device| device.name == name).cloned()
    }

    pub fn device_names(&self) -> Vec<String> {
        self.document().devices.iter().map(|device| device.name.clone()).collect()
    }

    pub fn document_copy(&self) -> Config {
        self.document().clone()
    }

    pub fn monitoring_settings(&self) -> MonitoringSettings {
        self.document().monitoring.clone()
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        self.document().notifications.clone()
    }

    pub fn troubleshooting(&self) -> Vec<TroubleshootCategory> {
        self.document().troubleshooting.clone()
    }

    /// Create a device with a ping check and a port check over `ports`
    pub fn add_device(&self, request: NewDevice) -> Result<Device, RegistryError> {
        let name = request.name.trim().to_string();
        validate_name(&name)?;
        let ports = validate_ports(&request.ports)?;
        let device = Device::from_host(name, request.host.trim(), ports, request.notifications_enabled);
        self.insert(device)
    }

    /// Add a fully specified device
    pub fn insert(&self, device: Device) -> Result<Device, RegistryError> {
        validate_device(&device)?;

        let added = self.mutate(|document| {
            if document.devices.iter().any(|existing| existing.name == device.name) {
                return Err(ValidationError::DuplicateName(device.name.clone()).into());
            }
            document.devices.push(device.clone());
            Ok(device)
        })?;

        tracing::info!(device = %added.name, checks = added.checks.len(), "Device added");
        Ok(added)
    }

    /// Replace a device's checks and flags, optionally renaming it. The
    /// device keeps its position in the list.
    pub fn update_device(&self, name: &str, update: DeviceUpdate) -> Result<Device, RegistryError> {
        let new_name = update.new_name.as_deref().map(str::trim).unwrap_or(name).to_string();
        validate_name(&new_name)?;
        let ports = validate_ports(&update.ports)?;
        let device = Device::from_host(new_name, update.host.trim(), ports, update.notifications_enabled);
        validate_device(&device)?;

        let updated = self.mutate(|document| {
            let idx = document
                .devices
                .iter()
                .position(|existing| existing.name == name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

            if device.name != name && document.devices.iter().any(|existing| existing.name == device.name) {
                return Err(ValidationError::DuplicateName(device.name.clone()).into());
            }

            document.devices[idx] = device.clone();
            Ok(device)
        })?;

        tracing::info!(device = %name, new_name = %updated.name, "Device updated");
        Ok(updated)
    }

    pub fn delete_device(&self, name: &str) -> Result<(), RegistryError> {
        self.mutate(|document| {
            let before = document.devices.len();
            document.devices.retain(|device| device.name != name);
            if document.devices.len() == before {
                return Err(RegistryError::NotFound(name.to_string()));
            }
            Ok(())
        })?;

        tracing::info!(device = %name, "Device deleted");
        Ok(())
    }

    pub fn set_notification_settings(&self, settings: NotificationSettings) -> Result<(), RegistryError> {
        let settings = NotificationSettings { webhook_url: settings.webhook_url.trim().to_string(), ..settings };
        let enabled = settings.enabled;

        self.mutate(|document| {
            document.notifications = settings;
            Ok(())
        })?;

        tracing::info!(enabled, "Notification settings updated");
        Ok(())
    }
}
