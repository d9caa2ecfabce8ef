use std::sync::Arc;

use ravenwatch::{MonitoringEngine, SchedulerHandle};

/// Shared by every worker through `web::Data`
pub struct AppState {
    pub engine: Arc<MonitoringEngine>,
    pub scheduler: SchedulerHandle,
}
