//! Prometheus metrics for the invoicer server.
//!
//! Tracks the tenant database lifecycle and authentication redirects.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no tenant ids, only aggregate counts. Restrict the endpoint to
//! scraper addresses at the infrastructure level all the same.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static DATABASE_SESSIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "invoicer_database_sessions_total",
        "Total number of database sessions handed to requests",
    )
    .expect("metric creation failed")
});

pub static DATABASE_RECREATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "invoicer_database_recreations_total",
            "Total number of tenant database recreations by trigger and outcome",
        ),
        &["trigger", "outcome"],
    )
    .expect("metric creation failed")
});

pub static LIMIT_EXCEEDED_REDIRECTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "invoicer_limit_exceeded_redirects_total",
        "Total number of requests redirected because a tenant database is over quota",
    )
    .expect("metric creation failed")
});

pub static AUTH_REDIRECTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "invoicer_auth_redirects_total",
            "Total number of requests redirected by the identity resolver",
        ),
        &["mode"],
    )
    .expect("metric creation failed")
});

pub static LOGIN_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "invoicer_login_failures_total",
        "Total number of rejected login attempts",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests can build as many routers as they like.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(DATABASE_SESSIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DATABASE_RECREATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LIMIT_EXCEEDED_REDIRECTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(AUTH_REDIRECTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LOGIN_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a recreation attempt.
pub fn record_recreation(trigger: &str, succeeded: bool) {
    let outcome = if succeeded { "ok" } else { "failed" };
    DATABASE_RECREATIONS
        .with_label_values(&[trigger, outcome])
        .inc();
}
