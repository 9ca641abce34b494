use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{mean, median, Counts, MetricsCollector, OpOutcome, OutcomeSink, Summary};

/// A global [`MetricsCollector`] plus one collector per namespace.
///
/// Per-namespace collectors are created on first use and never removed
/// during a run.
#[derive(Default)]
pub struct NamespacedMetrics {
    global: MetricsCollector,
    per_namespace: Mutex<HashMap<String, Arc<MetricsCollector>>>,
}

/// One row of the per-namespace breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceSummary {
    pub namespace: String,
    pub queries: u64,
    pub errors: u64,
    pub mean_ms: f64,
    pub p50_ms: f64,
}

impl NamespacedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record into the global collector and the collector for `namespace`.
    /// Outcomes the global collector discards after `stop` are not recorded
    /// per namespace either.
    pub fn record(&self, namespace: &str, latency: Duration, success: bool) {
        if self.global.record(latency, success) {
            self.collector_for(namespace).record(latency, success);
        }
    }

    fn collector_for(&self, namespace: &str) -> Arc<MetricsCollector> {
        let mut map = self.per_namespace.lock();
        if let Some(collector) = map.get(namespace) {
            return Arc::clone(collector);
        }
        let collector = Arc::new(MetricsCollector::new());
        // `stop` may have swept the map between the global record and this insert.
        if self.global.is_stopped() {
            collector.stop();
        }
        map.insert(namespace.to_string(), Arc::clone(&collector));
        collector
    }

    pub fn start(&self) {
        self.global.start();
    }

    pub fn stop(&self) {
        self.global.stop();
        for collector in self.per_namespace.lock().values() {
            collector.stop();
        }
    }

    pub fn counts(&self) -> Counts {
        self.global.counts()
    }

    pub fn global(&self) -> &MetricsCollector {
        &self.global
    }

    pub fn summary(&self) -> Summary {
        self.global.summary()
    }

    /// Rows for every namespace with at least one success, sorted by query
    /// count descending, ties by namespace name.
    pub fn per_namespace_summary(&self) -> Vec<NamespaceSummary> {
        let namespaces: Vec<(String, Arc<MetricsCollector>)> = self
            .per_namespace
            .lock()
            .iter()
            .map(|(ns, m)| (ns.clone(), Arc::clone(m)))
            .collect();

        let mut rows: Vec<NamespaceSummary> = namespaces
            .into_iter()
            .filter_map(|(namespace, m)| {
                let mut latencies = m.latencies_ms();
                if latencies.is_empty() {
                    return None;
                }
                latencies.sort_unstable_by(f64::total_cmp);
                let counts = m.counts();
                Some(NamespaceSummary {
                    namespace,
                    queries: counts.operations,
                    errors: counts.errors,
                    mean_ms: mean(&latencies),
                    p50_ms: median(&latencies),
                })
            })
            .collect();

        rows.sort_by(|a, b| b.queries.cmp(&a.queries).then_with(|| a.namespace.cmp(&b.namespace)));
        rows
    }
}

impl OutcomeSink for NamespacedMetrics {
    fn record_outcome(&self, namespace: Option<&str>, outcome: OpOutcome) {
        let namespace = namespace.unwrap_or("");
        match outcome {
            OpOutcome::Success { latency } => self.record(namespace, latency, true),
            OpOutcome::Failure => self.record(namespace, Duration::ZERO, false),
        }
    }
}

/// Namespace with the lowest and highest mean latency, in that order.
pub fn fastest_and_slowest(rows: &[NamespaceSummary]) -> Option<(&NamespaceSummary, &NamespaceSummary)> {
    let fastest = rows.iter().min_by(|a, b| a.mean_ms.total_cmp(&b.mean_ms))?;
    let slowest = rows.iter().max_by(|a, b| a.mean_ms.total_cmp(&b.mean_ms))?;
    Some((fastest, slowest))
}
