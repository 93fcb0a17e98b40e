mod routes;
mod state;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dispatch_config::{ServiceConfig, StoreConfig};
use dispatch_observability::{init, log_startup, ObservabilityConfig};
use dispatch_registry::Dispatcher;
use dispatch_storage_rest::RestStore;
use state::AppState;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env("dispatch-api");
    let obs_config = ObservabilityConfig::from(&config);
    let handle = init(&obs_config);
    log_startup(&handle, &obs_config.environment);

    let store_config = StoreConfig::from_env().context("store configuration")?;
    let store = RestStore::new(&store_config).context("store client")?;
    let dispatcher = Dispatcher::new(Arc::new(store));
    if let Err(err) = dispatcher.mount().await {
        tracing::warn!(error = %err.message, "initial load failed; waiting for the next change");
    }

    let bind_addr = config.bind_addr.clone();
    let state = web::Data::new(AppState {
        config,
        dispatcher: dispatcher.clone(),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("binding {bind_addr}"))?
    .run()
    .await?;

    dispatcher.teardown();
    Ok(())
}
