use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

use crate::state::AppState;

macros_utils::routes! {
    route health_route,
}

/// Liveness plus a glance at the monitor itself
#[get("")]
pub async fn health_route(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.engine.snapshot();
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "cycle": snapshot.cycle,
        "total_devices": snapshot.total_devices,
        "cycle_running": state.scheduler.is_running(),
        "subscribers": state.engine.subscriber_count(),
    }))
}
