use actix_web::{HttpResponse, Responder, get, post, web};

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route options_route,
    route run_route,
}

#[get("/options")]
pub async fn options_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.troubleshooting_options())
}

/// Runs the category's checks once, outside the cycle and without debouncing.
/// Responds with `{category, results}`.
#[post("/{id}")]
pub async fn run_route(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    match state.engine.troubleshoot(&id).await {
        Some(run) => Ok(HttpResponse::Ok().json(run)),
        None => Err(AppError::CategoryNotFound(id)),
    }
}
