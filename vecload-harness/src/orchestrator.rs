//! Named load-test scenarios built from the generator, metrics and worker pools.
//!
//! Every run moves `Idle → Running → (Completed | Cancelled)`. `Running`
//! starts with `metrics.start()` and ends once every worker has exited and
//! `metrics.stop()` has been called.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use vecload_common::{IndexStats, Result, VectorIndex};

use crate::config::{DeleteParams, FullParams, ReadParams, RunContext, StormParams, WriteParams};
use crate::generator::plan_batches;
use crate::metrics::{MetricsCollector, OutcomeSink, Summary};
use crate::namespace_metrics::{NamespaceSummary, NamespacedMetrics};
use crate::progress::{print_inline, report_while, run_for, WaitOutcome};
use crate::report::{read_progress_line, storm_progress_line, write_progress_line};
use crate::worker::{join_all_timed, namespace_scopes, run_upsert_pool, spawn_query_pool, UpsertPoolOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunState::Cancelled)
    }
}

/// Tracks and logs the state of one run.
struct Run {
    name: &'static str,
    state: RunState,
}

impl Run {
    fn new(name: &'static str) -> Self {
        Self { name, state: RunState::Idle }
    }

    fn begin(&mut self) {
        debug_assert_eq!(self.state, RunState::Idle);
        self.state = RunState::Running;
        info!(run = self.name, "run started");
    }

    fn finish(&mut self, cancelled: bool) -> RunState {
        debug_assert_eq!(self.state, RunState::Running);
        self.state = if cancelled { RunState::Cancelled } else { RunState::Completed };
        info!(run = self.name, state = ?self.state, "run finished");
        self.state
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteReport {
    pub state: RunState,
    pub requested_vectors: u64,
    pub total_batches: usize,
    /// Vectors in batches whose upsert succeeded. Failed batches count 0.
    pub vectors_upserted: u64,
    pub vectors_per_sec: f64,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadReport {
    pub state: RunState,
    pub threads: usize,
    pub top_k: u32,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StormReport {
    pub state: RunState,
    pub namespaces: usize,
    pub total_threads: usize,
    pub total_vectors: u64,
    pub summary: Summary,
    /// Sorted by query count, descending.
    pub per_namespace: Vec<NamespaceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StormOutcome {
    /// The index reported no namespaces; no workers were launched.
    NoNamespaces,
    Completed(StormReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteReport {
    /// The index was already empty; no delete was issued.
    NothingToDelete,
    Deleted {
        vectors_before: u64,
        /// Whatever the index reports after the settle pause. Not required to be 0.
        vectors_remaining: u64,
        delete_secs: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullReport {
    pub write: WriteReport,
    pub stats_after_write: Option<IndexStats>,
    /// `None` when the run was cancelled before the read phase.
    pub read: Option<ReadReport>,
    pub delete: Option<DeleteReport>,
}

/// Upsert `params.num_vectors` synthetic vectors in batches across
/// `params.num_threads` workers.
pub async fn run_write_test<I>(index: Arc<I>, params: &WriteParams, ctx: &RunContext) -> Result<WriteReport>
where
    I: VectorIndex + ?Sized + 'static,
{
    params.validate()?;

    let plans = Arc::new(plan_batches(params.num_vectors, params.batch_size));
    let total_batches = plans.len();
    info!(
        vectors = params.num_vectors,
        batches = total_batches,
        threads = params.num_threads,
        dimension = params.dimension,
        "starting write load test"
    );

    let metrics = Arc::new(MetricsCollector::new());
    let sink: Arc<dyn OutcomeSink> = metrics.clone();
    let stop = ctx.cancel.child_token();
    let options = UpsertPoolOptions {
        num_workers: params.num_threads,
        dimension: params.dimension,
        batch_size: params.batch_size,
        namespace: params.namespace.clone(),
    };

    let mut run = Run::new("write");
    run.begin();
    metrics.start();

    let pool = run_upsert_pool(index, plans, options, sink, stop);
    let vectors_upserted = if ctx.show_progress {
        let progress = Arc::clone(&metrics);
        let upserted = report_while(pool, ctx.progress_interval, |_| {
            print_inline(&write_progress_line(progress.counts().total(), total_batches));
        })
        .await;
        println!();
        upserted
    } else {
        pool.await
    };

    metrics.stop();
    let state = run.finish(ctx.cancel.is_cancelled());

    let summary = metrics.summary();
    let vectors_per_sec = if summary.elapsed_secs > 0.0 {
        vectors_upserted as f64 / summary.elapsed_secs
    } else {
        0.0
    };

    Ok(WriteReport {
        state,
        requested_vectors: params.num_vectors,
        total_batches,
        vectors_upserted,
        vectors_per_sec,
        summary,
    })
}

/// Query the whole index with random vectors from `params.num_threads`
/// workers for `params.duration`.
pub async fn run_read_test<I>(index: Arc<I>, params: &ReadParams, ctx: &RunContext) -> Result<ReadReport>
where
    I: VectorIndex + ?Sized + 'static,
{
    params.validate()?;
    info!(
        duration_secs = params.duration.as_secs_f64(),
        threads = params.num_threads,
        top_k = params.top_k,
        "starting read load test"
    );

    let metrics = Arc::new(MetricsCollector::new());
    let sink: Arc<dyn OutcomeSink> = metrics.clone();
    let stop = ctx.cancel.child_token();

    let mut run = Run::new("read");
    run.begin();
    metrics.start();

    let pool = spawn_query_pool(
        index,
        vec![None; params.num_threads],
        params.dimension,
        params.top_k,
        sink,
        stop.clone(),
    );

    let waited = run_for(params.duration, ctx.progress_interval, &ctx.cancel, |tick| {
        if ctx.show_progress {
            print_inline(&read_progress_line(tick.remaining_secs(), metrics.counts().operations));
        }
    })
    .await;

    stop.cancel();
    if ctx.show_progress {
        println!();
        println!("   Stopping threads...");
    }
    let shutdown = join_all_timed(pool).await;
    metrics.stop();
    info!(shutdown_ms = shutdown.as_millis() as u64, "read workers stopped");
    let state = run.finish(waited == WaitOutcome::Cancelled);

    Ok(ReadReport { state, threads: params.num_threads, top_k: params.top_k, summary: metrics.summary() })
}

/// Discover every namespace and query all of them at once with
/// `params.threads_per_namespace` workers each.
pub async fn run_storm_test<I>(index: Arc<I>, params: &StormParams, ctx: &RunContext) -> Result<StormOutcome>
where
    I: VectorIndex + ?Sized + 'static,
{
    params.validate()?;

    info!("discovering namespaces");
    let stats = index.describe_index_stats().await?;
    let namespaces = stats.namespace_names();
    if namespaces.is_empty() {
        info!("no namespaces found in index; nothing to query");
        return Ok(StormOutcome::NoNamespaces);
    }

    let scopes = namespace_scopes(&namespaces, params.threads_per_namespace);
    let total_threads = scopes.len();
    info!(
        namespaces = namespaces.len(),
        threads_per_namespace = params.threads_per_namespace,
        total_threads,
        duration_secs = params.duration.as_secs_f64(),
        top_k = params.top_k,
        total_vectors = stats.total_vector_count,
        "launching query storm"
    );

    let metrics = Arc::new(NamespacedMetrics::new());
    let sink: Arc<dyn OutcomeSink> = metrics.clone();
    let stop = ctx.cancel.child_token();

    let mut run = Run::new("storm");
    run.begin();
    metrics.start();

    let pool = spawn_query_pool(index, scopes, params.dimension, params.top_k, sink, stop.clone());

    let mut last_ops = 0u64;
    let waited = run_for(params.duration, ctx.progress_interval, &ctx.cancel, |tick| {
        let counts = metrics.counts();
        let delta = counts.operations.saturating_sub(last_ops);
        last_ops = counts.operations;
        if ctx.show_progress {
            print_inline(&storm_progress_line(tick.remaining_secs(), counts.operations, delta, counts.errors));
        }
    })
    .await;

    stop.cancel();
    if ctx.show_progress {
        println!();
        println!("   Stopping {total_threads} threads...");
    }
    let shutdown = join_all_timed(pool).await;
    metrics.stop();
    info!(shutdown_ms = shutdown.as_millis() as u64, "storm workers stopped");
    let state = run.finish(waited == WaitOutcome::Cancelled);

    Ok(StormOutcome::Completed(StormReport {
        state,
        namespaces: namespaces.len(),
        total_threads,
        total_vectors: stats.total_vector_count,
        summary: metrics.summary(),
        per_namespace: metrics.per_namespace_summary(),
    }))
}

/// Delete every vector in `params.namespace`, then report what remains.
///
/// Counts are scoped to the target namespace when one is given, otherwise
/// they are index-wide.
pub async fn run_delete_all<I>(index: &I, params: &DeleteParams, ctx: &RunContext) -> Result<DeleteReport>
where
    I: VectorIndex + ?Sized,
{
    let namespace = params.namespace.as_deref();
    let vectors_before = vector_count(&index.describe_index_stats().await?, namespace);
    info!(vectors = vectors_before, namespace, "current vector count");
    if vectors_before == 0 {
        return Ok(DeleteReport::NothingToDelete);
    }

    info!("deleting all vectors");
    let started = Instant::now();
    index.delete(true, namespace).await?;
    let delete_secs = started.elapsed().as_secs_f64();

    settle(params.settle, ctx).await;
    let vectors_remaining = vector_count(&index.describe_index_stats().await?, namespace);
    if vectors_remaining > 0 {
        warn!(vectors_remaining, "index still reports vectors after delete");
    }

    Ok(DeleteReport::Deleted { vectors_before, vectors_remaining, delete_secs })
}

/// Vectors in `namespace`, or in the whole index when `None`. An absent namespace holds 0.
fn vector_count(stats: &IndexStats, namespace: Option<&str>) -> u64 {
    match namespace {
        Some(ns) => stats.namespaces.get(ns).map(|s| s.vector_count).unwrap_or(0),
        None => stats.total_vector_count,
    }
}

/// Current index statistics.
pub async fn stats_snapshot<I>(index: &I) -> Result<IndexStats>
where
    I: VectorIndex + ?Sized,
{
    index.describe_index_stats().await
}

/// Write, let the index settle, snapshot, read, and optionally delete.
pub async fn run_full_test<I>(index: Arc<I>, params: &FullParams, ctx: &RunContext) -> Result<FullReport>
where
    I: VectorIndex + ?Sized + 'static,
{
    params.validate()?;

    let write = run_write_test(Arc::clone(&index), &params.write, ctx).await?;
    if ctx.cancel.is_cancelled() {
        return Ok(FullReport { write, stats_after_write: None, read: None, delete: None });
    }

    info!(settle_secs = params.settle.as_secs_f64(), "waiting for vectors to be indexed");
    settle(params.settle, ctx).await;
    let stats_after_write = Some(stats_snapshot(index.as_ref()).await?);

    let read = run_read_test(Arc::clone(&index), &params.read, ctx).await?;

    let delete = if params.delete_after && !ctx.cancel.is_cancelled() {
        Some(run_delete_all(index.as_ref(), &params.delete, ctx).await?)
    } else {
        None
    };

    Ok(FullReport { write, stats_after_write, read: Some(read), delete })
}

/// Sleep for `pause`, waking early if the run is cancelled.
pub async fn settle(pause: Duration, ctx: &RunContext) {
    tokio::select! {
        _ = ctx.cancel.cancelled() => {}
        _ = tokio::time::sleep(pause) => {}
    }
}
