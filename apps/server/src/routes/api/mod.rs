use actix_web::{HttpResponse, Responder, get, post, web};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

mod devices;
mod ravenna;
mod settings;
mod troubleshoot;

macros_utils::routes! {
    route status_route,
    route device_route,
    route run_now_route,
    module devices,
    module settings,
    module troubleshoot,
    module ravenna,
}

/// Latest published snapshot
#[get("/status")]
pub async fn status_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.snapshot())
}

#[get("/device/{name}")]
pub async fn device_route(state: web::Data<AppState>, name: web::Path<String>) -> Result<HttpResponse, AppError> {
    let name = name.into_inner();
    let snapshot = state.engine.snapshot();
    match snapshot.device(&name) {
        Some(device) => Ok(HttpResponse::Ok().json(device)),
        None => Err(AppError::DeviceNotFound(name)),
    }
}

/// Start a cycle now. Returns immediately, results arrive on the push channel.
#[post("/test")]
pub async fn run_now_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": state.scheduler.run_now() }))
}
