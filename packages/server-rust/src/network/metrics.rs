//! Prometheus `/metrics` endpoint for the process-level self-telemetry
//! report (§6: "Periodic self-report ... every 60s"). Installs a global
//! recorder once at startup; [`TelemetryReporter`](crate::telemetry::TelemetryReporter)
//! pushes gauges into it on its own rollover cadence, this module only
//! owns rendering the scrape response.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global `metrics` recorder and returns a standalone router
/// exposing `/metrics`. Mounted once per process; panics if a recorder is
/// already installed, matching the donor's fail-fast startup style.
#[must_use]
pub fn build_router() -> Router {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");

    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(handle)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
