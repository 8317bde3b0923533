/**
 * SWITCH SIM - Simulated network switch telemetry
 *
 * ROLE: keeps an evolving picture of one switch (CPU, memory, temperature,
 * interface traffic, fan/PSU health) and exposes it through an OID-style
 * value store and a Prometheus registry.
 *
 * BOOT: config -> engine (entities + metric registration) -> cycles -> HTTP.
 * Any failure before the listener is up aborts the process.
 */

mod config;
mod engine;
mod error;
mod http;
mod models;
mod oid;
mod publisher;
mod runtime;
mod state;
mod store;

use crate::config::load_config;
use crate::engine::{spawn_cycles, Simulator};
use crate::error::SimError;
use crate::http::AppState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("switch_sim=info")))
        .init();

    info!("switch simulator starting, version {}", env!("CARGO_PKG_VERSION"));

    let cfg = load_config().await.context("failed to load configuration")?;
    let sim = Arc::new(Simulator::new(&cfg).context("failed to build simulator")?);
    let stats = sim.prime_runtime();
    info!(
        "simulating {} interfaces, {} fans, {} psus ({} store entries, {} MB resident)",
        sim.interface_count(),
        sim.fan_count(),
        sim.psu_count(),
        sim.store().len(),
        stats.allocated_bytes / 1_048_576
    );
    for (key, value) in sim.store().walk(oid::SIM_PREFIX) {
        debug!("seeded {key} = {value:?}");
    }

    spawn_cycles(sim.clone());

    let app = http::build_router(AppState { sim });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(SimError::Listener)
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr} (/metrics, /health, /status)");
    axum::serve(listener, app)
        .await
        .map_err(SimError::Listener)
        .context("HTTP server stopped")?;
    Ok(())
}
