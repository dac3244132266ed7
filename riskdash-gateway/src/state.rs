use crate::config::Config;
use crate::engine::EngineClient;
use crate::routes::{self, QueryRoute};
use std::collections::HashMap;
use tracing::info;

pub struct AppState {
    pub engine: EngineClient,
    // Route table keyed by path. Built once at startup, never mutated.
    pub routes: HashMap<String, QueryRoute>,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let engine = EngineClient::from_config(cfg)?;

        let mut routes = HashMap::new();
        for route in routes::route_table(cfg) {
            info!("Registered query route: {} ({:?})", route.path, route.shape);
            routes.insert(route.path.to_string(), route);
        }

        Ok(AppState { engine, routes })
    }
}
