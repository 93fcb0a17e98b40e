use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::state::AppState;

/// Liveness stays 200 while a registry carries a load error; the body says which one.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    incidents_error: Option<String>,
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let resources_error = state.dispatcher.resources().snapshot().error;
    let incidents_error = state.dispatcher.incidents().snapshot().error;
    let status = if resources_error.is_none() && incidents_error.is_none() {
        "ok"
    } else {
        "degraded"
    };
    HttpResponse::Ok().json(HealthResponse {
        status,
        resources_error,
        incidents_error,
    })
}
