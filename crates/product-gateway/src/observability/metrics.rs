//! Metrics definitions for the product gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix for the gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: the fixed route table, everything else is `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `reason`, `stage`: bounded by the auth error and gate stage enums

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gw_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Validation is dominated by the JWKS fetch on a cache miss
        .set_buckets_for_metric(
            Matcher::Prefix("gw_token_validation".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("gw_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gw_http_requests_total`, `gw_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures every response, including 404/405 produced by the router and
/// 401 produced by the auth middleware.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    // Normalize endpoint to prevent cardinality explosion
    let normalized_endpoint = normalize_endpoint(endpoint);

    let status = categorize_status_code(status_code);

    histogram!("gw_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gw_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Product slugs and static asset paths are replaced with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/status" | "/ready" | "/metrics" | "/products" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    if path.starts_with("/static/") {
        return "/static/{path}".to_string();
    }

    // /products/{slug}/feedback
    let parts: Vec<&str> = path.split('/').collect();
    if let ["", "products", slug, "feedback"] = parts.as_slice() {
        if !slug.is_empty() {
            return "/products/{slug}/feedback".to_string();
        }
    }

    // Unknown paths normalized to "/other" to bound cardinality
    "/other".to_string()
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record a token gate decision.
///
/// Metric: `gw_token_validations_total`, `gw_token_validation_duration_seconds`
/// Labels: `outcome` (allowed, rejected), `reason`, `stage`
pub fn record_token_validation(outcome: &str, reason: &str, stage: &str, duration: Duration) {
    histogram!("gw_token_validation_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gw_token_validations_total",
        "outcome" => outcome.to_string(),
        "reason" => reason.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS fetch against the identity provider.
///
/// Metric: `gw_jwks_fetches_total`, `gw_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error, malformed)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("gw_jwks_fetch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gw_jwks_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests execute the recording functions for coverage. Without an
    // installed recorder the metrics crate records to a no-op sink.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/status", 200, Duration::from_millis(1));
        record_http_request("GET", "/products", 200, Duration::from_millis(40));
        record_http_request("GET", "/products", 401, Duration::from_millis(3));
        record_http_request(
            "POST",
            "/products/widget-1/feedback",
            202,
            Duration::from_millis(60),
        );
        record_http_request("GET", "/static/css/site.css", 200, Duration::from_millis(2));
        record_http_request("GET", "/nope", 404, Duration::from_millis(1));
        record_http_request("GET", "/products", 408, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(202), "success");
        assert_eq!(categorize_status_code(299), "success");

        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");

        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(501), "error");
        assert_eq!(categorize_status_code(503), "error");
    }

    #[test]
    fn test_normalize_static_routes() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/status"), "/status");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/products"), "/products");
    }

    #[test]
    fn test_normalize_feedback_route() {
        assert_eq!(
            normalize_endpoint("/products/widget-1/feedback"),
            "/products/{slug}/feedback"
        );
        assert_eq!(
            normalize_endpoint("/products/another-product/feedback"),
            "/products/{slug}/feedback"
        );
        assert_eq!(normalize_endpoint("/products//feedback"), "/other");
        assert_eq!(normalize_endpoint("/products/widget-1"), "/other");
        assert_eq!(normalize_endpoint("/products/a/b/feedback"), "/other");
    }

    #[test]
    fn test_normalize_static_assets() {
        assert_eq!(normalize_endpoint("/static/app.js"), "/static/{path}");
        assert_eq!(normalize_endpoint("/static/img/logo.png"), "/static/{path}");
    }

    #[test]
    fn test_normalize_unknown_paths() {
        assert_eq!(normalize_endpoint("/admin"), "/other");
        assert_eq!(normalize_endpoint("/static"), "/other");
        assert_eq!(normalize_endpoint(""), "/other");
    }

    #[test]
    fn test_record_token_validation() {
        record_token_validation("allowed", "none", "allowed", Duration::from_millis(2));
        record_token_validation(
            "rejected",
            "invalid_audience",
            "received",
            Duration::from_micros(80),
        );
        record_token_validation(
            "rejected",
            "expired_token",
            "key_resolved",
            Duration::from_millis(3),
        );
    }

    #[test]
    fn test_record_jwks_fetch() {
        record_jwks_fetch("success", Duration::from_millis(120));
        record_jwks_fetch("error", Duration::from_secs(10));
        record_jwks_fetch("malformed", Duration::from_millis(90));
    }
}
