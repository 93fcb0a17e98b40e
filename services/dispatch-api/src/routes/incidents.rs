use actix_web::{get, patch, post, web, HttpResponse};
use dispatch_core::{
    Incident, IncidentId, IncidentPatch, IncidentPriority, IncidentStatus,
    Location, NewIncident, Resource, ResourceId, ResourceType,
};
use serde::{Deserialize, Serialize};

use crate::routes::common::{dispatch_error, parse_id, respond};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: IncidentStatus,
}

/// Editable incident fields. Status and assignments have their own endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct IncidentEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<IncidentPriority>,
    pub reported_by: Option<String>,
    pub contact_number: Option<String>,
    pub location: Option<Location>,
}

impl From<IncidentEdit> for IncidentPatch {
    fn from(edit: IncidentEdit) -> Self {
        Self {
            title: edit.title,
            description: edit.description,
            priority: edit.priority,
            reported_by: edit.reported_by,
            contact_number: edit.contact_number,
            location: edit.location,
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    pub incident: Option<Incident>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

#[derive(Debug, Serialize)]
pub struct CandidateResponse {
    pub nearest: Option<Resource>,
    pub available: Vec<Resource>,
}

#[get("/v1/incidents")]
pub async fn list_incidents(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.incidents().snapshot())
}

#[get("/v1/incidents/{id}")]
pub async fn get_incident(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let incident_id: IncidentId = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(state.dispatcher.incidents().require(incident_id))
}

#[post("/v1/incidents")]
pub async fn report_incident(
    state: web::Data<AppState>,
    payload: web::Json<NewIncident>,
) -> HttpResponse {
    match state
        .dispatcher
        .incidents()
        .report_incident(payload.into_inner())
        .await
    {
        Ok(incident) => HttpResponse::Created().json(incident),
        Err(err) => dispatch_error(err),
    }
}

#[patch("/v1/incidents/{id}")]
pub async fn update_incident(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<IncidentEdit>,
) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        state
            .dispatcher
            .incidents()
            .update_incident(incident_id, payload.into_inner().into())
            .await,
    )
}

#[post("/v1/incidents/{id}/status")]
pub async fn update_status(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<StatusChange>,
) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        state
            .dispatcher
            .incidents()
            .update_status(incident_id, payload.status)
            .await,
    )
}

#[post("/v1/incidents/{id}/status/override")]
pub async fn override_status(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<StatusChange>,
) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        state
            .dispatcher
            .incidents()
            .set_status(incident_id, payload.status)
            .await,
    )
}

#[post("/v1/incidents/{id}/assign")]
pub async fn assign(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<AssignRequest>,
) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(state.dispatcher.assign(incident_id, payload.resource_id).await)
}

#[post("/v1/incidents/{id}/resolve")]
pub async fn resolve(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(state.dispatcher.mark_resolved(incident_id).await)
}

#[post("/v1/incidents/{id}/cancel")]
pub async fn cancel(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<CancelRequest>,
) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let confirm = payload.confirm;
    match state
        .dispatcher
        .cancel_incident(incident_id, |_| confirm)
        .await
    {
        Ok(incident) => HttpResponse::Ok().json(CancelResponse {
            cancelled: incident.is_some(),
            incident,
        }),
        Err(err) => dispatch_error(err),
    }
}

#[get("/v1/incidents/{id}/candidates")]
pub async fn candidates(
    state: web::Data<AppState>,
    id: web::Path<String>,
    query: web::Query<CandidateQuery>,
) -> HttpResponse {
    let incident_id = match parse_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let dispatcher = &state.dispatcher;
    match dispatcher.nearest_available(incident_id, query.resource_type) {
        Ok(nearest) => HttpResponse::Ok().json(CandidateResponse {
            nearest,
            available: dispatcher.available_for(query.resource_type),
        }),
        Err(err) => dispatch_error(err),
    }
}

