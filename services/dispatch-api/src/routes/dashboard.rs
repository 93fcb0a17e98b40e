use actix_web::{get, web, HttpResponse};
use dispatch_core::ResourceType;
use serde::Deserialize;

use crate::state::AppState;

const DEFAULT_RECENT: usize = 5;
const MAX_RECENT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default, rename = "type")]
    pub resource_type: Option<ResourceType>,
    pub recent: Option<usize>,
}

#[get("/v1/dashboard")]
pub async fn dashboard(
    state: web::Data<AppState>,
    query: web::Query<DashboardQuery>,
) -> HttpResponse {
    let recent = query.recent.unwrap_or(DEFAULT_RECENT).min(MAX_RECENT);
    HttpResponse::Ok().json(state.dispatcher.dashboard(query.resource_type, recent))
}

#[get("/v1/map")]
pub async fn map(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.map_view())
}

#[get("/v1/assignments/dangling")]
pub async fn dangling(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.dangling_assignments())
}
