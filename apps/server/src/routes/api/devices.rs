use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use ravenwatch::{DeviceUpdate, NewDevice};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route list_route,
    route add_route,
    route update_route,
    route delete_route,
}

#[get("")]
pub async fn list_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.registry().device_names())
}

/// Monitored from the next cycle on
#[post("")]
pub async fn add_route(state: web::Data<AppState>, body: web::Json<NewDevice>) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let device = web::block(move || state.engine.registry().add_device(request)).await??;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Device {} added", device.name),
        "device": device,
    })))
}

#[put("/{name}")]
pub async fn update_route(
    state: web::Data<AppState>,
    name: web::Path<String>,
    body: web::Json<DeviceUpdate>,
) -> Result<HttpResponse, AppError> {
    let (name, update) = (name.into_inner(), body.into_inner());
    let device = web::block(move || state.engine.registry().update_device(&name, update)).await??;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Device {} updated", device.name),
        "device": device,
    })))
}

#[delete("/{name}")]
pub async fn delete_route(state: web::Data<AppState>, name: web::Path<String>) -> Result<HttpResponse, AppError> {
    let name = name.into_inner();
    let target = name.clone();
    web::block(move || state.engine.registry().delete_device(&target)).await??;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Device {name} deleted"),
    })))
}
