//! Gateway onto a PostgREST-style hosted backend (`/rest/v1/<table>`), authenticated with
//! the project's access key.
//!
//! The backend's realtime socket is not spoken here; [`ChangeFeed`] is served by polling a
//! cheap `id,updated_at` projection of the table and emitting a notice whenever it moves.

use async_trait::async_trait;
use dispatch_config::StoreConfig;
use dispatch_core::{
    Incident, IncidentId, IncidentPatch, NewIncident, NewResource, Resource, ResourceId,
    ResourcePatch,
};
use dispatch_storage::{
    ChangeFeed, IncidentGateway, ResourceGateway, StoreError, Subscription, Table,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod poll;

const ORDER_NEWEST_FIRST: &str = "created_at.desc";

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    schema: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.access_key)
            .map_err(|_| StoreError::rejected("store access key is not a valid header value"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.access_key))
            .map_err(|_| StoreError::rejected("store access key is not a valid header value"))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(map_err)?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            schema: config.schema.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    fn request(&self, method: Method, table: Table, query: &[(&str, String)]) -> RequestBuilder {
        let profile_header = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        self.client
            .request(method, table_url(&self.base_url, table))
            .query(query)
            .header(profile_header, &self.schema)
    }

    async fn fetch_all<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, StoreError> {
        let request = self.request(
            Method::GET,
            table,
            &[
                ("select", "*".to_string()),
                ("order", ORDER_NEWEST_FIRST.to_string()),
            ],
        );
        send_rows(request).await
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: Table,
        record: &B,
    ) -> Result<T, StoreError> {
        let request = self
            .request(Method::POST, table, &[("select", "*".to_string())])
            .header("Prefer", "return=representation")
            .json(record);
        single_row(send_rows(request).await?, table, "insert")
    }

    async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: Table,
        id: String,
        patch: &B,
    ) -> Result<T, StoreError> {
        let request = self
            .request(Method::PATCH, table, &[("id", id_filter(&id)), ("select", "*".to_string())])
            .header("Prefer", "return=representation")
            .json(patch);
        let rows = send_rows(request).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found(format!("{table} row {id} not found")));
        }
        single_row(rows, table, "update")
    }

    async fn remove(&self, table: Table, id: String) -> Result<(), StoreError> {
        let request = self
            .request(Method::DELETE, table, &[("id", id_filter(&id)), ("select", "id".to_string())])
            .header("Prefer", "return=representation");
        let rows: Vec<serde_json::Value> = send_rows(request).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found(format!("{table} row {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceGateway for RestStore {
    async fn fetch_resources(&self) -> Result<Vec<Resource>, StoreError> {
        self.fetch_all(Table::Resources).await
    }

    async fn insert_resource(&self, record: NewResource) -> Result<Resource, StoreError> {
        self.insert(Table::Resources, &record).await
    }

    async fn update_resource(
        &self,
        id: ResourceId,
        patch: ResourcePatch,
    ) -> Result<Resource, StoreError> {
        self.update(Table::Resources, id.to_string(), &patch).await
    }

    async fn remove_resource(&self, id: ResourceId) -> Result<(), StoreError> {
        self.remove(Table::Resources, id.to_string()).await
    }
}

#[async_trait]
impl IncidentGateway for RestStore {
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        self.fetch_all(Table::Incidents).await
    }

    async fn insert_incident(&self, record: NewIncident) -> Result<Incident, StoreError> {
        #[derive(Serialize)]
        struct IncidentInsert<'a> {
            #[serde(flatten)]
            record: &'a NewIncident,
            status: dispatch_core::IncidentStatus,
        }

        let body = IncidentInsert {
            record: &record,
            status: record.initial_status(),
        };
        self.insert(Table::Incidents, &body).await
    }

    async fn update_incident(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> Result<Incident, StoreError> {
        self.update(Table::Incidents, id.to_string(), &patch).await
    }

    async fn remove_incident(&self, id: IncidentId) -> Result<(), StoreError> {
        self.remove(Table::Incidents, id.to_string()).await
    }
}

impl ChangeFeed for RestStore {
    fn subscribe(&self, table: Table) -> Subscription {
        poll::subscribe(self.clone(), table, self.poll_interval)
    }
}

pub(crate) fn table_url(base_url: &str, table: Table) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table.as_str())
}

fn id_filter(id: &str) -> String {
    format!("eq.{id}")
}

async fn send_rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>, StoreError> {
    let response = request.send().await.map_err(map_err)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_from_response(status, &body));
    }
    response.json::<Vec<T>>().await.map_err(|err| {
        StoreError::unavailable(format!("unexpected response from store: {err}"))
    })
}

fn single_row<T>(rows: Vec<T>, table: Table, operation: &str) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or_else(|| {
        StoreError::unavailable(format!("store returned no row for {operation} on {table}"))
    })
}

/// Turns a non-2xx backend response into a store error, keeping the backend's own message.
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let parsed = serde_json::from_str::<BackendErrorBody>(body).ok();
    let code = parsed.as_ref().and_then(|body| body.code.clone());
    let message = parsed
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("store responded with {status}"));

    match (status, code.as_deref()) {
        (_, Some("42P01")) => StoreError::unavailable(format!(
            "table not found, ensure the schema is applied: {message}"
        )),
        (_, Some("PGRST301")) | (StatusCode::UNAUTHORIZED, _) | (StatusCode::FORBIDDEN, _) => {
            StoreError::unavailable(format!("store rejected credentials: {message}"))
        }
        (StatusCode::NOT_FOUND, _) => StoreError::not_found(message),
        (StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY, _) => {
            StoreError::rejected(message)
        }
        _ => StoreError::unavailable(message),
    }
}

fn map_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::unavailable(err.to_string())
}
