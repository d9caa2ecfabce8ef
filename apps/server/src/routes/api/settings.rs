use actix_web::{HttpResponse, Responder, get, post, web};
use ravenwatch::NotificationSettings;
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route read_route,
    route replace_route,
    route test_alert_route,
}

#[get("")]
pub async fn read_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.registry().notification_settings())
}

#[post("")]
pub async fn replace_route(
    state: web::Data<AppState>,
    body: web::Json<NotificationSettings>,
) -> Result<HttpResponse, AppError> {
    let settings = body.into_inner();
    web::block(move || state.engine.registry().set_notification_settings(settings)).await??;
    Ok(HttpResponse::Ok().json(json!({ "status": "success", "message": "Settings saved" })))
}

/// Sends a sample alert regardless of cooldown and the enabled flag
#[post("/test")]
pub async fn test_alert_route(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    state.engine.send_test_alert().await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success", "message": "Test notification sent" })))
}
