use actix_web::{HttpResponse, Responder, get, web};

use crate::state::AppState;

macros_utils::routes! {
    route status_route,
    route ptp_route,
    route streams_route,
}

#[get("/status")]
pub async fn status_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.ravenna_overview())
}

#[get("/ptp")]
pub async fn ptp_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.ptp_overview())
}

#[get("/streams")]
pub async fn streams_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.stream_overview())
}
