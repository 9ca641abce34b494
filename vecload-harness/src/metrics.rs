use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::warn;

/// Result of one call against the index. Error detail is not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpOutcome {
    Success { latency: Duration },
    Failure,
}

impl OpOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OpOutcome::Success { .. })
    }
}

/// Anything workers can hand an outcome to. `namespace` is `None` for
/// unscoped calls.
pub trait OutcomeSink: Send + Sync {
    fn record_outcome(&self, namespace: Option<&str>, outcome: OpOutcome);
}

#[derive(Default)]
struct State {
    operation_count: u64,
    error_count: u64,
    /// One entry per successful operation, in milliseconds, insertion order (unsorted).
    latencies_ms: Vec<f64>,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

/// Thread-safe accumulator of operation outcomes for one run.
///
/// Invariant: `operation_count == latencies_ms.len()`. Once [`stop`](Self::stop)
/// has been called the counts are frozen.
#[derive(Default)]
pub struct MetricsCollector {
    state: Mutex<State>,
}

/// Counter snapshot used by the live progress line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub operations: u64,
    pub errors: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.operations + self.errors
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome. Returns `false` when the collector has already been
    /// stopped and the outcome was discarded.
    pub fn record(&self, latency: Duration, success: bool) -> bool {
        let mut state = self.state.lock();
        if state.stopped_at.is_some() {
            drop(state);
            warn!("outcome recorded after metrics were stopped; discarding");
            return false;
        }
        if success {
            state.operation_count += 1;
            state.latencies_ms.push(latency.as_secs_f64() * 1_000.0);
        } else {
            state.error_count += 1;
        }
        true
    }

    pub fn start(&self) {
        self.state.lock().started_at = Some(Instant::now());
    }

    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.stopped_at.is_none() {
            state.stopped_at = Some(Instant::now());
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped_at.is_some()
    }

    pub fn counts(&self) -> Counts {
        let state = self.state.lock();
        Counts { operations: state.operation_count, errors: state.error_count }
    }

    /// Summarise the current snapshot. Elapsed time runs to `now` while the
    /// collector is still active.
    pub fn summary(&self) -> Summary {
        let state = self.state.lock();
        let elapsed_secs = match state.started_at {
            Some(start) => state
                .stopped_at
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(start)
                .as_secs_f64(),
            None => 0.0,
        };
        let latency = LatencyStats::compute(&state.latencies_ms, state.operation_count, elapsed_secs);
        Summary {
            operations: state.operation_count,
            errors: state.error_count,
            elapsed_secs,
            latency,
        }
    }

    /// Copy of the raw latency samples, in milliseconds.
    pub fn latencies_ms(&self) -> Vec<f64> {
        self.state.lock().latencies_ms.clone()
    }
}

impl OutcomeSink for MetricsCollector {
    fn record_outcome(&self, _namespace: Option<&str>, outcome: OpOutcome) {
        match outcome {
            OpOutcome::Success { latency } => self.record(latency, true),
            OpOutcome::Failure => self.record(Duration::ZERO, false),
        };
    }
}

/// Counts and timing for a finished (or in-flight) run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub operations: u64,
    pub errors: u64,
    pub elapsed_secs: f64,
    /// `None` when no operation succeeded.
    #[serde(flatten)]
    pub latency: Option<LatencyStats>,
}

impl Summary {
    pub fn ops_per_sec(&self) -> f64 {
        self.latency.as_ref().map(|l| l.ops_per_sec).unwrap_or(0.0)
    }
}

/// Throughput and latency figures; only present when at least one sample exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub ops_per_sec: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    pub fn compute(latencies_ms: &[f64], operations: u64, elapsed_secs: f64) -> Option<Self> {
        if latencies_ms.is_empty() {
            return None;
        }
        let mut sorted = latencies_ms.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);
        let ops_per_sec = if elapsed_secs > 0.0 { operations as f64 / elapsed_secs } else { 0.0 };
        Some(Self {
            ops_per_sec,
            mean_ms: mean(&sorted),
            p50_ms: median(&sorted),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
        })
    }
}

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Middle value of `sorted`, or the mean of the two middle values for an even count.
/// Returns 0 for an empty slice.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Return the element of ascending `sorted` at index `floor(p * n)`.
/// This is nearest-rank without interpolation. Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
