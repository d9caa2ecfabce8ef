use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::checker;
use super::types::CheckResult;
use crate::APP_NAME;
use crate::models::{Check, Device};

/// Performs one probe for one check. Implementations never fail to the
/// caller: every problem becomes a down result.
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run(&self, check: &Check, timeout: Duration) -> CheckResult;
}

/// Monitoring executor - runs the protocol probes
pub struct CheckExecutor {
    http: reqwest::Client,
}

impl CheckExecutor {
    /// Create a new executor with its own HTTP client
    pub fn new() -> Result<Self, reqwest::Error> {
        // No idle connections, so every request resolves the host again
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl CheckRunner for CheckExecutor {
    async fn run(&self, check: &Check, timeout: Duration) -> CheckResult {
        let result = CheckResult::new(check.check_type(), check.target());
        let started = Instant::now();

        match tokio::time::timeout(timeout, checker::probe(&self.http, &check.kind, timeout)).await {
            Ok(Ok(details)) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                result.success(format!("{details} ({elapsed_ms:.1}ms)"), elapsed_ms)
            }
            Ok(Err(e)) => result.failure(e.to_string()),
            Err(_) => result.failure(timed_out(timeout)),
        }
    }
}

fn timed_out(timeout: Duration) -> String {
    format!("Check timed out after {:.1}s", timeout.as_secs_f64())
}

/// Results of one device, in check order
#[derive(Debug, Clone)]
pub struct DeviceResults {
    pub device: String,
    pub results: Vec<CheckResult>,
}

/// Run every check of every device concurrently.
///
/// At most `max_concurrent` probes are in flight; each probe gets `timeout`
/// once it holds a slot. The call returns only when every check resolved,
/// with results in device and check order.
pub async fn execute_cycle(
    runner: Arc<dyn CheckRunner>,
    devices: &[Device],
    timeout: Duration,
    max_concurrent: usize,
) -> Vec<DeviceResults> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();
    let mut slots = HashMap::new();

    for (device_idx, device) in devices.iter().enumerate() {
        for (check_idx, check) in device.checks.iter().enumerate() {
            let runner = runner.clone();
            let semaphore = semaphore.clone();
            let check = check.clone();

            let handle = tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await;
                let fallback = CheckResult::new(check.check_type(), check.target());
                match tokio::time::timeout(timeout, runner.run(&check, timeout)).await {
                    Ok(result) => result,
                    Err(_) => fallback.failure(timed_out(timeout)),
                }
            });
            slots.insert(handle.id(), (device_idx, check_idx));
        }
    }

    let mut collected: Vec<Vec<Option<CheckResult>>> =
        devices.iter().map(|device| vec![None; device.checks.len()]).collect();

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, result)) => (id, Ok(result)),
            Err(e) => (e.id(), Err(e)),
        };

        let Some(&(device_idx, check_idx)) = slots.get(&id) else {
            continue;
        };
        let check = &devices[device_idx].checks[check_idx];

        let result = outcome.unwrap_or_else(|e| {
            tracing::error!(
                device = %devices[device_idx].name,
                check = %check.check_type(),
                error = %e,
                "Check task failed"
            );
            CheckResult::new(check.check_type(), check.target()).failure(format!("Check task failed: {e}"))
        });
        collected[device_idx][check_idx] = Some(result);
    }

    devices
        .iter()
        .zip(collected)
        .map(|(device, results)| DeviceResults {
            device: device.name.clone(),
            results: device
                .checks
                .iter()
                .zip(results)
                .map(|(check, result)| {
                    result.unwrap_or_else(|| {
                        CheckResult::new(check.check_type(), check.target())
                            .failure("Check did not report a result")
                    })
                })
                .collect(),
        })
        .collect()
}
