use std::sync::Arc;

use actiond_core::config::Config;
use actiond_core::{ActionRegistry, ActionsEndpoint, StoreFilterEngine};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub endpoint: Arc<ActionsEndpoint>,
    /// Server-wide verbose-error default; requests may still opt in with
    /// the `verbose` parameter.
    pub verbose_errors: bool,
}

impl AppState {
    pub fn new(endpoint: ActionsEndpoint, verbose_errors: bool) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            verbose_errors,
        }
    }

    /// Wire the registry to the object inventory and dispatch settings
    /// described by `config`.
    pub fn from_config(config: &Config, registry: ActionRegistry) -> Self {
        let store = Arc::new(config.object_store());
        let filter = Arc::new(StoreFilterEngine::new(store));
        let endpoint =
            ActionsEndpoint::new(Arc::new(registry), filter).with_workers(config.dispatch.workers);
        Self::new(endpoint, config.verbose_errors)
    }
}
