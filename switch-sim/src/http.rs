/*!
 * READ ENDPOINTS - HTTP surface of the simulator
 *
 * - GET /metrics : full push-registry snapshot, Prometheus text format
 * - GET /health  : "ok" once startup registration is done
 * - GET /status  : simulator process stats + entity counts as JSON
 *
 * Handlers only read. The cycles own every mutation.
 */

use crate::engine::Simulator;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub sim: Arc<Simulator>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub simulator_version: &'static str,
    pub application_uptime_seconds: f64,
    pub active_goroutines: usize,
    pub total_gc_runs: u64,
    pub memory_allocated_mb: String,
    pub total_memory_obtained_mb: String,
    pub last_gc_timestamp: String,
    pub simulated_interfaces_count: usize,
    pub simulated_fans_count: usize,
    pub simulated_psus_count: usize,
}

fn megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0 / 1024.0)
}

fn rfc3339(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(&Rfc3339)
}

impl StatusReport {
    fn collect(sim: &Simulator) -> Result<Self, time::error::Format> {
        let stats = sim.runtime_stats();
        let last_reclaim = stats.last_reclaim.unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Ok(StatusReport {
            simulator_version: env!("CARGO_PKG_VERSION"),
            application_uptime_seconds: stats.uptime.as_secs_f64(),
            active_goroutines: stats.live_tasks,
            total_gc_runs: stats.reclaim_count,
            memory_allocated_mb: megabytes(stats.allocated_bytes),
            total_memory_obtained_mb: megabytes(stats.obtained_bytes),
            last_gc_timestamp: rfc3339(last_reclaim)?,
            simulated_interfaces_count: sim.interface_count(),
            simulated_fans_count: sim.fan_count(),
            simulated_psus_count: sim.psu_count(),
        })
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(get_metrics))
        .route("/status", get(get_status))
        .with_state(app_state)
}

// GET /metrics
async fn get_metrics(State(app): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let families = app.sim.registry().gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!("failed to encode metrics: {e}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response()
}

// GET /status
async fn get_status(State(app): State<AppState>) -> Response {
    let report = match StatusReport::collect(&app.sim) {
        Ok(report) => report,
        Err(e) => {
            error!("failed to format last reclaim timestamp: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "unable to produce status").into_response();
        }
    };
    match serde_json::to_vec(&report) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("failed to encode status as JSON: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "unable to produce status").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::engine::spawn_cycles;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Instant;
    use time::{Date, Month};
    use tower::ServiceExt;

    fn app() -> (Arc<Simulator>, Router) {
        let sim = Arc::new(Simulator::new(&SimConfig::default()).unwrap());
        let router = build_router(AppState { sim: sim.clone() });
        (sim, router)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let resp = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let (_sim, router) = app();
        assert_eq!(get_body(router, "/health").await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn test_status_after_startup() {
        let (sim, router) = app();
        sim.prime_runtime();
        let (fast, slow) = spawn_cycles(sim.clone());

        let (status, body) = get_body(router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["simulator_version"], "1.1.0");
        assert!(json["active_goroutines"].as_u64().unwrap() >= 2);
        assert_eq!(json["simulated_interfaces_count"], 5);
        assert_eq!(json["simulated_fans_count"], 2);
        assert_eq!(json["simulated_psus_count"], 2);
        assert!(json["application_uptime_seconds"].as_f64().unwrap() >= 0.0);
        let allocated = json["memory_allocated_mb"].as_str().unwrap();
        assert_eq!(allocated.split('.').nth(1).map(str::len), Some(2));
        assert!(OffsetDateTime::parse(json["last_gc_timestamp"].as_str().unwrap(), &Rfc3339).is_ok());

        fast.abort();
        slow.abort();
    }

    #[test]
    fn test_unformattable_timestamp_is_an_error() {
        let epoch = rfc3339(OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(epoch, "1970-01-01T00:00:00Z");

        let before_year_zero = Date::from_calendar_date(-1, Month::January, 1).unwrap().midnight().assume_utc();
        assert!(rfc3339(before_year_zero).is_err());
    }

    #[tokio::test]
    async fn test_metrics_exposes_labelled_samples() {
        let (sim, router) = app();
        let mut rng = rand::rng();
        let t = Instant::now();
        sim.slow_tick(&mut rng, t);
        sim.fast_tick(&mut rng, t + std::time::Duration::from_secs(1));

        let (status, body) = get_body(router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("snmp_sim_device_cpu_usage_percent "));
        assert!(body.contains(r#"snmp_sim_device_fan_status{fanDescr="FAN1_SLOT1",fanIndex="1"}"#));
        assert!(body.contains(r#"snmp_sim_device_psu_status{psuDescr="PSU2_SLOT1",psuIndex="2"} 2"#));
        assert!(body.contains(r#"snmp_sim_device_if_in_rate_bytes_per_second{ifDescr="GigabitEthernet1/0/1",ifIndex="1"}"#));
        assert!(!body.contains(r#"ifDescr="GigabitEthernet1/0/3""#));
        assert!(body.contains("# TYPE snmp_sim_app_gc_count_total counter"));
    }
}
