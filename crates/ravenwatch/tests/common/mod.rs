//! Shared fixtures: a scripted check runner, an in-memory document store and
//! a recording alert sink.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ravenwatch::config::ConfigError;
use ravenwatch::notify::DeliveryError;
use ravenwatch::{
    AlertRequest, AlertSink, Check, CheckResult, CheckRunner, Config, Device, DeviceRegistry, DocumentStore,
    MonitoringEngine,
};

pub const WEBHOOK: &str = "https://example.test/hook";

/// Answers every check from a per-target script of up/down outcomes. The
/// last outcome repeats once the script runs out; unknown targets are up.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    delay: Mutex<Duration>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, target: &str, outcomes: &[bool]) {
        self.scripts.lock().unwrap().insert(target.to_string(), outcomes.iter().copied().collect());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn next(&self, target: &str) -> bool {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(target) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or(true),
            Some(script) => script.front().copied().unwrap_or(true),
            None => true,
        }
    }
}

#[async_trait]
impl CheckRunner for ScriptedRunner {
    async fn run(&self, check: &Check, _timeout: Duration) -> CheckResult {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let target = check.target();
        let result = CheckResult::new(check.check_type(), target.clone());
        if self.next(&target) {
            result.success("scripted up", 1.0)
        } else {
            result.failure("scripted down")
        }
    }
}

/// Keeps the last saved document in memory, can be told to fail
#[derive(Default)]
pub struct MemoryStore {
    pub fail: AtomicBool,
    pub saved: Mutex<Option<Config>>,
}

impl DocumentStore for MemoryStore {
    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConfigError::Invalid("read-only document".into()));
        }
        *self.saved.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<AlertRequest>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Deliveries run on spawned tasks, give them a moment
    pub async fn wait_for(&self, expected: usize) -> usize {
        for _ in 0..50 {
            if self.count() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.count()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, _webhook_url: &str, alert: &AlertRequest) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<MonitoringEngine>,
    pub runner: Arc<ScriptedRunner>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(devices: Vec<Device>, failure_threshold: u32, cooldown_secs: u64) -> Self {
        let _ = tracing_subscriber::fmt::try_init();

        let mut config = Config::default();
        config.monitoring.failure_threshold = failure_threshold;
        config.monitoring.notification_cooldown = cooldown_secs;
        config.monitoring.check_timeout = 2;
        config.notifications.webhook_url = WEBHOOK.to_string();
        config.devices = devices;

        let runner = ScriptedRunner::new();
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(MemoryStore::default());
        let registry = DeviceRegistry::new(store.clone(), config);
        let engine = Arc::new(MonitoringEngine::new(registry, runner.clone(), sink.clone()));

        Self { engine, runner, sink, store }
    }

    /// Run one cycle to completion
    pub async fn cycle(&self) -> Arc<ravenwatch::Snapshot> {
        let permit = self.engine.try_begin_cycle().expect("no cycle should be running");
        self.engine.run_cycle(permit).await
    }
}

/// The canonical two-check device: reachability plus one service port
pub fn core_device() -> Device {
    Device::from_host("Core", "10.0.0.1", vec![80], true)
}
