use actix_web::{delete, get, patch, post, web, HttpResponse};
use dispatch_core::{
    DispatchError, IncidentId, Location, NewResource, OwnerId, ResourceId, ResourcePatch,
    ResourceStatus, ResourceType,
};
use serde::Deserialize;

use crate::routes::common::{dispatch_error, parse_id, respond};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ResourceStatus,
    #[serde(default)]
    pub incident_id: Option<IncidentId>,
}

/// Editable resource fields. `updated_at` is stamped by the registry.
#[derive(Debug, Default, Deserialize)]
pub struct ResourceEdit {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,
    pub status: Option<ResourceStatus>,
    pub location: Option<Location>,
    pub owner_id: Option<OwnerId>,
}

impl From<ResourceEdit> for ResourcePatch {
    fn from(edit: ResourceEdit) -> Self {
        Self {
            name: edit.name,
            resource_type: edit.resource_type,
            status: edit.status,
            location: edit.location,
            owner_id: edit.owner_id,
            updated_at: None,
        }
    }
}

#[get("/v1/resources")]
pub async fn list_resources(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.resources().snapshot())
}

#[get("/v1/resources/{id}")]
pub async fn get_resource(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let resource_id: ResourceId = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state.dispatcher.resources().get(resource_id) {
        Some(resource) => HttpResponse::Ok().json(resource),
        None => dispatch_error(DispatchError::not_found(format!(
            "resource {resource_id} not found"
        ))),
    }
}

#[post("/v1/resources")]
pub async fn add_resource(
    state: web::Data<AppState>,
    payload: web::Json<NewResource>,
) -> HttpResponse {
    match state
        .dispatcher
        .resources()
        .add_resource(payload.into_inner())
        .await
    {
        Ok(resource) => HttpResponse::Created().json(resource),
        Err(err) => dispatch_error(err),
    }
}

#[patch("/v1/resources/{id}")]
pub async fn update_resource(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<ResourceEdit>,
) -> HttpResponse {
    let resource_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        state
            .dispatcher
            .resources()
            .update_resource(resource_id, payload.into_inner().into())
            .await,
    )
}

#[delete("/v1/resources/{id}")]
pub async fn delete_resource(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let resource_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state.dispatcher.resources().delete_resource(resource_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => dispatch_error(err),
    }
}

#[post("/v1/resources/{id}/status")]
pub async fn set_resource_status(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<StatusChange>,
) -> HttpResponse {
    let resource_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let change = payload.into_inner();
    respond(
        state
            .dispatcher
            .resources()
            .set_status(resource_id, change.status, change.incident_id)
            .await,
    )
}

#[post("/v1/resources/{id}/release")]
pub async fn release_resource(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let resource_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(state.dispatcher.release(resource_id).await)
}
