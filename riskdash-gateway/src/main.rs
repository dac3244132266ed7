mod config;
mod engine;
mod gateway;
mod routes;
mod state;

use axum::http::{header, HeaderValue, Method};
use config::Config;
use state::AppState;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("RISKDASH_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let cfg = Config::from_file(&config_path)?;

    let state = Arc::new(AppState::from_config(&cfg)?);

    // Only the configured frontend origin may call the gateway. POST/PUT/
    // DELETE are declared for the frontend's client but unused by the routes.
    let origin: HeaderValue = cfg.frontend_origin().parse().map_err(|e| {
        anyhow::anyhow!("Invalid frontend origin '{}': {}", cfg.frontend_origin(), e)
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = gateway::router(state).layer(cors);

    let port: u16 = match std::env::var("PORT") {
        Ok(p) => p
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid PORT '{}': {}", p, e))?,
        Err(_) => 5000,
    };
    let addr: SocketAddr = format!("{}:{}", cfg.listen_host(), port).parse()?;
    info!(%addr, "Starting riskdash-gateway");

    let server = axum::Server::bind(&addr).serve(app.into_make_service());

    let graceful = server.with_graceful_shutdown(shutdown_signal());
    graceful.await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}
