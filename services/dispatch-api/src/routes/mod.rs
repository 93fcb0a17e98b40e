pub mod common;
pub mod dashboard;
pub mod health;
pub mod incidents;
pub mod resources;
pub mod status;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(status::status)
        .service(dashboard::dashboard)
        .service(dashboard::map)
        .service(dashboard::dangling)
        .service(resources::list_resources)
        .service(resources::get_resource)
        .service(resources::add_resource)
        .service(resources::update_resource)
        .service(resources::delete_resource)
        .service(resources::set_resource_status)
        .service(resources::release_resource)
        .service(incidents::list_incidents)
        .service(incidents::get_incident)
        .service(incidents::report_incident)
        .service(incidents::update_incident)
        .service(incidents::update_status)
        .service(incidents::override_status)
        .service(incidents::assign)
        .service(incidents::resolve)
        .service(incidents::cancel)
        .service(incidents::candidates);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use dispatch_config::ServiceConfig;
    use dispatch_core::{Incident, IncidentStatus, Resource, ResourceStatus};
    use dispatch_registry::Dispatcher;
    use dispatch_storage::{MemoryStore, Operation, Table};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState {
            config: ServiceConfig::from_lookup("dispatch-api", |_| None),
            dispatcher: Dispatcher::new(Arc::new(MemoryStore::new())),
        })
    }

    fn ambulance_body() -> Value {
        json!({
            "name": "Ambulance 101",
            "type": "ambulance",
            "status": "available",
            "location": {"latitude": 37.7749, "longitude": -122.4194, "address": "1 Dr Carlton B Goodlett Pl"}
        })
    }

    fn incident_body() -> Value {
        json!({
            "title": "Medical Emergency",
            "priority": "high",
            "reported_by": "Jordan Kim",
            "contact_number": "555-0142",
            "location": {"latitude": 37.7793, "longitude": -122.4192, "address": "City Hall"}
        })
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn health_is_degraded_after_a_failed_load() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(Table::Resources, Operation::FetchAll);
        let dispatcher = Dispatcher::new(store);
        assert!(dispatcher.mount().await.is_err());
        let state = web::Data::new(AppState {
            config: ServiceConfig::from_lookup("dispatch-api", |_| None),
            dispatcher,
        });
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "degraded");
        assert!(body["resources_error"].is_string());
        assert!(body.get("incidents_error").is_none());
    }

    #[actix_web::test]
    async fn assign_over_http_engages_both_sides() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/resources")
            .set_json(ambulance_body())
            .to_request();
        let resource: Resource = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/v1/incidents")
            .set_json(incident_body())
            .to_request();
        let incident: Incident = test::call_and_read_body_json(&app, req).await;
        assert_eq!(incident.status, IncidentStatus::Pending);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/incidents/{}/assign", incident.id))
            .set_json(json!({ "resource_id": resource.id }))
            .to_request();
        let receipt: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(receipt["incident"]["status"], "in_progress");
        assert_eq!(
            receipt["incident"]["assigned_ambulance_id"],
            resource.id.to_string()
        );
        assert_eq!(receipt["resource"]["status"], "in_use");

        let req = test::TestRequest::get()
            .uri("/v1/dashboard?type=ambulance")
            .to_request();
        let dashboard: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(dashboard["active_incidents"], 1);
        assert_eq!(dashboard["resources_by_status"]["in_use"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/resources/{}/release", resource.id))
            .to_request();
        let released: Resource = test::call_and_read_body_json(&app, req).await;
        assert_eq!(released.status, ResourceStatus::Available);
    }

    #[actix_web::test]
    async fn errors_map_to_status_codes() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let mut invalid = ambulance_body();
        invalid["location"]["latitude"] = json!(95.0);
        let req = test::TestRequest::post()
            .uri("/v1/resources")
            .set_json(invalid)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/incidents/{}/resolve", dispatch_core::IncidentId::new()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/v1/resources/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn checked_transition_conflicts_but_override_applies() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/v1/incidents")
            .set_json(incident_body())
            .to_request();
        let incident: Incident = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/v1/incidents/{}/status", incident.id))
            .set_json(json!({ "status": "resolved" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/incidents/{}/status/override", incident.id))
            .set_json(json!({ "status": "resolved" }))
            .to_request();
        let overridden: Incident = test::call_and_read_body_json(&app, req).await;
        assert_eq!(overridden.status, IncidentStatus::Resolved);
    }

    #[actix_web::test]
    async fn cancel_requires_confirmation() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/v1/incidents")
            .set_json(incident_body())
            .to_request();
        let incident: Incident = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/v1/incidents/{}/cancel", incident.id))
            .set_json(json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cancelled"], false);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/incidents/{}/cancel", incident.id))
            .set_json(json!({ "confirm": true }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cancelled"], true);
        assert_eq!(body["incident"]["status"], "cancelled");
    }

    #[actix_web::test]
    async fn edits_are_validated_and_stamped_by_the_service() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/incidents")
            .set_json(incident_body())
            .to_request();
        let incident: Incident = test::call_and_read_body_json(&app, req).await;
        let req = test::TestRequest::patch()
            .uri(&format!("/v1/incidents/{}", incident.id))
            .set_json(json!({ "title": "  ", "reported_by": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/v1/resources")
            .set_json(ambulance_body())
            .to_request();
        let resource: Resource = test::call_and_read_body_json(&app, req).await;
        let req = test::TestRequest::patch()
            .uri(&format!("/v1/resources/{}", resource.id))
            .set_json(json!({ "name": "Medic 101", "updated_at": "2000-01-01T00:00:00Z" }))
            .to_request();
        let edited: Resource = test::call_and_read_body_json(&app, req).await;
        assert_eq!(edited.name, "Medic 101");
        assert!(edited.updated_at >= resource.updated_at);
    }
}
