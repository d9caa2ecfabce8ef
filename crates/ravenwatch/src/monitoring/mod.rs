/// Monitoring module - probes devices and drives monitoring cycles
///
/// This module is responsible for:
/// - Executing protocol checks with a hard timeout
/// - Fanning checks out with bounded concurrency
/// - Scheduling periodic and on-demand cycles
/// - Validating device and check definitions
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use executor::{CheckExecutor, CheckRunner, DeviceResults, execute_cycle};
pub use scheduler::{CycleGuard, CyclePermit, MonitoringScheduler, RunNow, SchedulerHandle};
pub use types::{CheckResult, MonitorStatus};
pub use validation::ValidationError;
