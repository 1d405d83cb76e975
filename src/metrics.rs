// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for nomad-external-dns.
//!
//! All metrics carry the namespace prefix `nomad_external_dns_`.
//!
//! # Metrics Categories
//!
//! - **Cycle Metrics** - Update and prune cycles, their outcome and duration
//! - **Record Metrics** - Records written and deleted per zone
//! - **Error Metrics** - Failures by worker and reason code
//! - **State Metrics** - Number of services currently tracked
//!
//! When `app.metrics_addr` is set, [`serve`] exposes the registry on
//! `GET /metrics` together with a `GET /healthz` liveness probe.
//!
//! # Example
//!
//! ```rust,no_run
//! use nomad_external_dns::metrics::record_cycle_success;
//!
//! record_cycle_success("update", std::time::Duration::from_millis(120));
//! ```

use crate::constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH};
use crate::scheduler::RunContext;
use anyhow::{Context, Result};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "nomad_external_dns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Cycle Metrics
// ============================================================================

/// Total number of worker cycles by worker and status
///
/// Labels:
/// - `worker`: `update` or `prune`
/// - `status`: Outcome (`success`, `error`)
pub static CYCLES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cycles_total"),
        "Total number of worker cycles by worker and status",
    );
    let counter = CounterVec::new(opts, &["worker", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of worker cycles in seconds
///
/// Labels:
/// - `worker`: `update` or `prune`
pub static CYCLE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_cycle_duration_seconds"),
        "Duration of worker cycles in seconds by worker",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["worker"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Record Metrics
// ============================================================================

/// Total number of records written to the provider
///
/// Labels:
/// - `zone`: Fully qualified zone name
pub static RECORDS_WRITTEN_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_written_total"),
        "Total number of records written by zone",
    );
    let counter = CounterVec::new(opts, &["zone"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of records deleted from the provider
///
/// Labels:
/// - `zone`: Fully qualified zone name
pub static RECORDS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_deleted_total"),
        "Total number of records deleted by zone",
    );
    let counter = CounterVec::new(opts, &["zone"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by worker and reason
///
/// Labels:
/// - `worker`: `update` or `prune`
/// - `reason`: Reason code (`ClusterFetchError`, `ProviderWriteError`, ...)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by worker and reason",
    );
    let counter = CounterVec::new(opts, &["worker", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// State Metrics
// ============================================================================

/// Number of services currently held in the reconciliation state
pub static TRACKED_SERVICES: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_tracked_services"),
        "Number of services currently held in the reconciliation state",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful cycle
///
/// # Arguments
/// * `worker` - Worker that ran the cycle (`update` or `prune`)
/// * `duration` - Duration of the cycle
pub fn record_cycle_success(worker: &str, duration: Duration) {
    CYCLES_TOTAL.with_label_values(&[worker, "success"]).inc();
    CYCLE_DURATION_SECONDS
        .with_label_values(&[worker])
        .observe(duration.as_secs_f64());
}

/// Record a cycle that was aborted
///
/// # Arguments
/// * `worker` - Worker that ran the cycle
/// * `duration` - Duration of the cycle before failure
pub fn record_cycle_error(worker: &str, duration: Duration) {
    CYCLES_TOTAL.with_label_values(&[worker, "error"]).inc();
    CYCLE_DURATION_SECONDS
        .with_label_values(&[worker])
        .observe(duration.as_secs_f64());
}

/// Record records written to a zone
pub fn record_records_written(zone: &str, count: usize) {
    RECORDS_WRITTEN_TOTAL
        .with_label_values(&[zone])
        .inc_by(count as f64);
}

/// Record records deleted from a zone
pub fn record_records_deleted(zone: &str, count: usize) {
    RECORDS_DELETED_TOTAL
        .with_label_values(&[zone])
        .inc_by(count as f64);
}

/// Record an error
///
/// # Arguments
/// * `worker` - Worker where the error occurred
/// * `reason` - Reason code from [`crate::errors::SyncError::reason`]
pub fn record_error(worker: &str, reason: &str) {
    ERRORS_TOTAL.with_label_values(&[worker, reason]).inc();
}

/// Set the number of tracked services
pub fn set_tracked_services(count: usize) {
    TRACKED_SERVICES.set(count as f64);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

// ============================================================================
// HTTP Endpoint
// ============================================================================

/// Router serving `/metrics` and `/healthz`.
pub fn router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(health_handler))
}

/// Serve metrics on `addr` until `ctx` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, ctx: RunContext) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {addr}"))?;

    info!(address = %addr, "Starting metrics server");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { ctx.cancelled().await })
        .await
        .context("Metrics server failed")?;

    info!("Metrics server shut down");
    Ok(())
}

async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
