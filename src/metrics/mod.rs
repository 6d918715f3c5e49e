//! Prometheus metrics for the item service.
//!
//! Tracks handled requests by query kind and outcome, plus search latency
//! and hit volume per index.
//!
//! # Example
//! ```no_run
//! use item_service::metrics::ITEM_REQUESTS_TOTAL;
//!
//! ITEM_REQUESTS_TOTAL
//!     .with_label_values(&["GetItemById", "success"])
//!     .inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "item_service";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Requests handled by the dispatcher
    ///
    /// Labels: action (query kind), outcome (`success` or error code)
    pub static ref ITEM_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("requests_total", "Total number of dispatched item requests")
            .namespace(NAMESPACE),
        &["action", "outcome"]
    ).expect("Failed to create ITEM_REQUESTS_TOTAL metric");

    /// Search duration in seconds, both passes included
    ///
    /// Labels: index
    pub static ref SEARCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("search_duration_seconds", "Search duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["index"]
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Matches found before paging
    ///
    /// Labels: index
    pub static ref SEARCH_HITS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_hits_total", "Total number of search matches")
            .namespace(NAMESPACE),
        &["index"]
    ).expect("Failed to create SEARCH_HITS_TOTAL metric");
}

/// Register all metrics with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(ITEM_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_HITS_TOTAL.clone()))?;

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counter() {
        ITEM_REQUESTS_TOTAL
            .with_label_values(&["Search", "success"])
            .inc();

        let value = ITEM_REQUESTS_TOTAL
            .with_label_values(&["Search", "success"])
            .get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_gather_after_init() {
        // The registry is global; another test may have registered already
        let _ = init_metrics();
        SEARCH_HITS_TOTAL.with_label_values(&["sitecore_web_index"]).inc_by(3.0);

        let metrics = gather_metrics();
        assert!(metrics.contains("item_service_search_hits_total"));
    }
}
