// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::repository::LookupCounts;

// Re-export for public API
pub use server::{health_handler, metrics_handler};

// ============================================================================
// Metrics Module - Prometheus metrics for the query paths
// ============================================================================
//
// - Store round trips and latency per operation
// - Relation lookups issued while resolving unloaded relations (N+1 cost),
//   split by endpoint and relation
// - Orders returned per endpoint
//
// Scraped via /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub store_queries: IntCounterVec,
    pub store_query_duration: HistogramVec,
    pub store_errors: IntCounterVec,
    pub relation_lookups: IntCounterVec,
    pub orders_returned: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let store_queries = IntCounterVec::new(
            Opts::new("store_queries_total", "Total store round trips"),
            &["operation"],
        )?;
        registry.register(Box::new(store_queries.clone()))?;

        let store_query_duration = HistogramVec::new(
            HistogramOpts::new("store_query_duration_seconds", "Store round trip duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(store_query_duration.clone()))?;

        let store_errors = IntCounterVec::new(
            Opts::new("store_errors_total", "Store round trips that failed"),
            &["operation"],
        )?;
        registry.register(Box::new(store_errors.clone()))?;

        let relation_lookups = IntCounterVec::new(
            Opts::new(
                "relation_lookups_total",
                "Extra lookups issued to resolve unloaded relations",
            ),
            &["endpoint", "relation"],
        )?;
        registry.register(Box::new(relation_lookups.clone()))?;

        let orders_returned = IntCounterVec::new(
            Opts::new("orders_returned_total", "Orders returned to callers"),
            &["endpoint"],
        )?;
        registry.register(Box::new(orders_returned.clone()))?;

        Ok(Self {
            registry,
            store_queries,
            store_query_duration,
            store_errors,
            relation_lookups,
            orders_returned,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_store_query(&self, operation: &str, duration_secs: f64, success: bool) {
        self.store_queries.with_label_values(&[operation]).inc();
        if !success {
            self.store_errors.with_label_values(&[operation]).inc();
        }
        self.store_query_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn record_lookups(&self, endpoint: &str, lookups: &LookupCounts) {
        for (relation, count) in lookups.by_relation() {
            if count > 0 {
                self.relation_lookups
                    .with_label_values(&[endpoint, relation])
                    .inc_by(count as u64);
            }
        }
    }

    pub fn record_orders_returned(&self, endpoint: &str, count: usize) {
        self.orders_returned
            .with_label_values(&[endpoint])
            .inc_by(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(metrics: &Metrics, name: &str) -> Option<f64> {
        metrics
            .registry()
            .gather()
            .iter()
            .find(|m| m.name() == name)
            .and_then(|m| m.metric[0].counter.value)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_store_query("find_one", 0.001, true);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_store_query_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_store_query("find_all_with_items", 0.01, false);

        assert_eq!(counter(&metrics, "store_queries_total"), Some(1.0));
        assert_eq!(counter(&metrics, "store_errors_total"), Some(1.0));
    }

    fn lookups(metrics: &Metrics, endpoint: &str, relation: &str) -> u64 {
        metrics
            .relation_lookups
            .with_label_values(&[endpoint, relation])
            .get()
    }

    #[test]
    fn test_record_lookups_splits_by_relation() {
        let metrics = Metrics::new().unwrap();
        let header = LookupCounts { member: 2, delivery: 2, ..Default::default() };
        metrics.record_lookups("v2_simple_orders", &header);
        let repeat = LookupCounts { member: 1, ..Default::default() };
        metrics.record_lookups("v2_simple_orders", &repeat);

        assert_eq!(lookups(&metrics, "v2_simple_orders", "member"), 3);
        assert_eq!(lookups(&metrics, "v2_simple_orders", "delivery"), 2);
        assert_eq!(lookups(&metrics, "v2_simple_orders", "item"), 0);
    }

    #[test]
    fn test_record_orders_returned() {
        let metrics = Metrics::new().unwrap();
        metrics.record_orders_returned("v3_orders", 2);

        assert_eq!(counter(&metrics, "orders_returned_total"), Some(2.0));
    }
}
