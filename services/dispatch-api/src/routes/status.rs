use actix_web::{get, web, HttpResponse};
use dispatch_core::{now, Timestamp};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct StatusResponse {
    service: String,
    environment: String,
    resources_mounted: bool,
    incidents_mounted: bool,
    timestamp: Timestamp,
}

#[get("/v1/status")]
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let dispatcher = &state.dispatcher;
    let response = StatusResponse {
        service: state.config.service_name.clone(),
        environment: state.config.environment.to_string(),
        resources_mounted: dispatcher.resources().is_mounted(),
        incidents_mounted: dispatcher.incidents().is_mounted(),
        timestamp: now(),
    };

    HttpResponse::Ok().json(response)
}
