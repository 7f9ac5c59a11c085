//! Prometheus metrics collection.
//!
//! Covers HTTP traffic by route kind, advertisement cache efficiency,
//! upstream fetch outcomes and how version resolution ended.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::sync::Arc;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Route kind, see [`route_kind`]
    pub route: String,
    /// Response status code
    pub status: u16,
}

/// Cache lookup labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CacheLabels {
    /// `hit` or `miss`
    pub result: String,
}

/// Labels for operations that end in a named outcome.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

/// Global metrics state.
pub static METRICS: Lazy<MetricsState> = Lazy::new(MetricsState::new);

/// Metrics state container.
#[derive(Clone)]
pub struct MetricsState {
    /// Prometheus registry.
    pub registry: Arc<RwLock<Registry>>,
    /// HTTP request counter.
    pub http_requests_total: Family<HttpLabels, Counter>,
    /// HTTP request duration histogram (seconds).
    pub http_request_duration_seconds: Family<HttpLabels, Histogram>,
    /// Requests currently being served.
    pub requests_in_flight: Gauge,
    /// Advertisement cache lookups.
    pub cache_lookups_total: Family<CacheLabels, Counter>,
    /// Upstream advertisement fetches by outcome.
    pub upstream_fetches_total: Family<OutcomeLabels, Counter>,
    /// Upstream advertisement fetch duration (seconds).
    pub upstream_fetch_duration_seconds: Histogram,
    /// Version resolutions by outcome.
    pub resolutions_total: Family<OutcomeLabels, Counter>,
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests_total = Family::<HttpLabels, Counter>::default();
        registry.register(
            "gopkg_http_requests",
            "Total HTTP requests",
            http_requests_total.clone(),
        );

        let http_request_duration_seconds =
            Family::<HttpLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.001, 2.0, 16))
            });
        registry.register(
            "gopkg_http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_request_duration_seconds.clone(),
        );

        let requests_in_flight = Gauge::default();
        registry.register(
            "gopkg_http_requests_in_flight",
            "Number of requests being served",
            requests_in_flight.clone(),
        );

        let cache_lookups_total = Family::<CacheLabels, Counter>::default();
        registry.register(
            "gopkg_cache_lookups",
            "Advertisement cache lookups by result",
            cache_lookups_total.clone(),
        );

        let upstream_fetches_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "gopkg_upstream_fetches",
            "Upstream advertisement fetches by outcome",
            upstream_fetches_total.clone(),
        );

        let upstream_fetch_duration_seconds = Histogram::new(exponential_buckets(0.005, 2.0, 12));
        registry.register(
            "gopkg_upstream_fetch_duration_seconds",
            "Upstream advertisement fetch duration in seconds",
            upstream_fetch_duration_seconds.clone(),
        );

        let resolutions_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "gopkg_resolutions",
            "Version resolutions by outcome",
            resolutions_total.clone(),
        );

        Self {
            registry: Arc::new(RwLock::new(registry)),
            http_requests_total,
            http_request_duration_seconds,
            requests_in_flight,
            cache_lookups_total,
            upstream_fetches_total,
            upstream_fetch_duration_seconds,
            resolutions_total,
        }
    }

    /// Record a finished HTTP request. `route` is a [`route_kind`] label.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            route: route.to_string(),
            status,
        };

        self.http_requests_total.get_or_create(&labels).inc();
        self.http_request_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record an advertisement cache lookup.
    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups_total
            .get_or_create(&CacheLabels {
                result: result.to_string(),
            })
            .inc();
    }

    /// Record an upstream fetch.
    pub fn record_upstream_fetch(&self, outcome: &str, duration_secs: f64) {
        self.upstream_fetches_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.to_string(),
            })
            .inc();
        self.upstream_fetch_duration_seconds.observe(duration_secs);
    }

    /// Record how a resolution ended.
    pub fn record_resolution(&self, outcome: &str) {
        self.resolutions_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Encode metrics for Prometheus scraping.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &registry) {
            tracing::error!(error = %e, "Failed to encode metrics");
        }
        buffer
    }
}

/// Collapses a request path into a bounded set of route names.
///
/// Package paths are unbounded, so they are labelled by what the request
/// does rather than by path.
pub fn route_kind(path: &str) -> &'static str {
    match path {
        "/" => "home",
        "/health-check" => "health",
        "/metrics" => "metrics",
        p if p.ends_with("/info/refs") => "info_refs",
        p if p.ends_with("/git-upload-pack") => "upload_pack",
        _ => "package",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_kind() {
        assert_eq!(route_kind("/"), "home");
        assert_eq!(route_kind("/health-check"), "health");
        assert_eq!(route_kind("/yaml.v2/info/refs"), "info_refs");
        assert_eq!(route_kind("/user/pkg.v1/git-upload-pack"), "upload_pack");
        assert_eq!(route_kind("/user/pkg.v1/sub"), "package");
    }

    #[test]
    fn test_metrics_state_creation() {
        let metrics = MetricsState::new();
        metrics.record_http_request("GET", route_kind("/health-check"), 200, 0.001);
        metrics.record_cache_lookup(true);
        metrics.record_upstream_fetch("ok", 0.02);
        metrics.record_resolution("no_version");

        let encoded = metrics.encode();
        assert!(encoded.contains("gopkg_http_requests"));
        assert!(encoded.contains("route=\"health\""));
        assert!(encoded.contains("gopkg_cache_lookups_total{result=\"hit\"} 1"));
        assert!(encoded.contains("outcome=\"no_version\""));
    }
}
