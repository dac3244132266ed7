use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    // Base URL of the external query engine's REST API.
    pub engine_url: String,
    // Fully-qualified name of the wide fact table (per-user access records).
    pub fact_table: String,
    // Fully-qualified name of the license-assignment table.
    pub license_table: String,
    // Bind host. The listening port comes from the PORT env var (default 5000).
    pub listen: Option<String>,
    // The single origin allowed to call the gateway from a browser.
    // Defaults to the local dev frontend.
    pub frontend_origin: Option<String>,
    // Enables the two license endpoints. One of the two upstream dashboard
    // deployments serves them, the other does not; defaults to serving them.
    pub license_routes: Option<bool>,
    // Per-HTTP-call timeout toward the engine, in seconds. Unset means no
    // timeout on the gateway side; the engine's own job limits apply.
    pub timeout_secs: Option<u64>,
    // Job-status polling cadence in milliseconds. Defaults to 250.
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let cfg_str = fs::read_to_string(path)?;
        Ok(toml::from_str(&cfg_str)?)
    }

    pub fn listen_host(&self) -> &str {
        self.listen.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn frontend_origin(&self) -> &str {
        self.frontend_origin
            .as_deref()
            .unwrap_or("http://localhost:5173")
    }

    pub fn license_routes(&self) -> bool {
        self.license_routes.unwrap_or(true)
    }
}
