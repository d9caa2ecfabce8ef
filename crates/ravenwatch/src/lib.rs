//! ravenwatch - network device monitoring engine
//!
//! Probes a configured set of devices with heterogeneous checks (ping, HTTP,
//! TCP ports, PTP, multicast, RTP, DSCP and RAVENNA services), debounces
//! failures per check, raises cooldown-limited alerts on device state changes
//! and publishes every completed cycle to push subscribers.

pub mod broadcast;
pub mod config;
pub mod engine;
pub mod models;
pub mod monitoring;
pub mod notify;
pub mod registry;
pub mod state;
pub mod summary;
pub mod troubleshoot;

// Re-export main types
pub use broadcast::{Broadcaster, PushMessage, StatusStore, Subscription};
pub use config::{Config, ConfigError, ConfigFile, MonitoringSettings, NotificationSettings};
pub use engine::MonitoringEngine;
pub use models::{Check, CheckKind, CheckType, Device, Snapshot};
pub use monitoring::{
    CheckExecutor, CheckResult, CheckRunner, MonitorStatus, MonitoringScheduler, RunNow, SchedulerHandle,
};
pub use notify::{AlertRequest, AlertSink, DeliveryError, NotificationDispatcher, TeamsWebhook};
pub use registry::{DeviceRegistry, DeviceUpdate, DocumentStore, NewDevice, RegistryError};
pub use state::{StateTracker, Transition};

/// Name used in user agents and alert cards
pub const APP_NAME: &str = "ravenwatch";
