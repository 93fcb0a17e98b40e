use dispatch_config::ServiceConfig;
use dispatch_registry::Dispatcher;

pub struct AppState {
    pub config: ServiceConfig,
    pub dispatcher: Dispatcher,
}
