use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use vecload_common::VectorIndex;

use crate::generator::{generate_vector, BatchPlan};
use crate::metrics::{OpOutcome, OutcomeSink};

/// Shape of a count-bounded upsert pool.
#[derive(Debug, Clone)]
pub struct UpsertPoolOptions {
    pub num_workers: usize,
    pub dimension: usize,
    /// Used for the `batch_id` metadata tag.
    pub batch_size: usize,
    pub namespace: Option<String>,
}

/// Drain `plans` with up to `num_workers` concurrent upsert workers.
///
/// Each worker claims the next unclaimed plan, materialises the batch,
/// upserts it and records the outcome, until no plans remain or `cancel`
/// fires. Returns once every claimed batch has been recorded, with the
/// number of vectors in batches whose upsert succeeded.
pub async fn run_upsert_pool<I>(
    index: Arc<I>,
    plans: Arc<Vec<BatchPlan>>,
    options: UpsertPoolOptions,
    sink: Arc<dyn OutcomeSink>,
    cancel: CancellationToken,
) -> u64
where
    I: VectorIndex + ?Sized + 'static,
{
    let UpsertPoolOptions { num_workers, dimension, batch_size, namespace } = options;
    let next = Arc::new(AtomicUsize::new(0));
    let upserted = Arc::new(AtomicU64::new(0));
    let workers = num_workers.min(plans.len());

    let mut pool = JoinSet::new();
    for worker_id in 0..workers {
        let index = Arc::clone(&index);
        let plans = Arc::clone(&plans);
        let next = Arc::clone(&next);
        let upserted = Arc::clone(&upserted);
        let namespace = namespace.clone();
        let sink = Arc::clone(&sink);
        let cancel = cancel.clone();
        pool.spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let slot = next.fetch_add(1, Ordering::Relaxed);
                let Some(plan) = plans.get(slot) else { break };

                let vectors = plan.materialize(dimension, batch_size);
                let op_start = Instant::now();
                let result = index.upsert(&vectors, namespace.as_deref()).await;
                let latency = op_start.elapsed();

                match result {
                    Ok(_) => {
                        sink.record_outcome(namespace.as_deref(), OpOutcome::Success { latency });
                        upserted.fetch_add(plan.count as u64, Ordering::Relaxed);
                    }
                    Err(e) => {
                        sink.record_outcome(namespace.as_deref(), OpOutcome::Failure);
                        warn!(worker_id, start_id = plan.start_id, "upsert error: {e}");
                    }
                }
            }
            debug!(worker_id, "upsert worker exiting");
        });
    }

    join_all(pool).await;
    upserted.load(Ordering::Relaxed)
}

/// Which namespace a query worker targets. `None` queries the whole index.
pub type QueryScope = Option<String>;

/// Launch one query worker per entry in `scopes`. Every worker loops
/// generate → query → record until `cancel` fires, checking the token
/// before each call. Returns the join handles; await them with [`join_all`]
/// after cancelling.
pub fn spawn_query_pool<I>(
    index: Arc<I>,
    scopes: Vec<QueryScope>,
    dimension: usize,
    top_k: u32,
    sink: Arc<dyn OutcomeSink>,
    cancel: CancellationToken,
) -> JoinSet<()>
where
    I: VectorIndex + ?Sized + 'static,
{
    let mut pool = JoinSet::new();
    for (worker_id, scope) in scopes.into_iter().enumerate() {
        let index = Arc::clone(&index);
        let sink = Arc::clone(&sink);
        let cancel = cancel.clone();
        pool.spawn(async move {
            while !cancel.is_cancelled() {
                let query_vector = generate_vector(dimension);
                let op_start = Instant::now();
                let result = index.query(&query_vector, top_k, scope.as_deref()).await;
                let latency = op_start.elapsed();

                match result {
                    Ok(_) => sink.record_outcome(scope.as_deref(), OpOutcome::Success { latency }),
                    Err(e) => {
                        sink.record_outcome(scope.as_deref(), OpOutcome::Failure);
                        if !cancel.is_cancelled() {
                            match scope.as_deref() {
                                Some(ns) => warn!(worker_id, namespace = ns, "query error: {e}"),
                                None => warn!(worker_id, "query error: {e}"),
                            }
                        }
                    }
                }
            }
            debug!(worker_id, "query worker exiting");
        });
    }
    pool
}

/// `threads_per_namespace` scopes for each namespace, grouped by namespace.
pub fn namespace_scopes(namespaces: &[String], threads_per_namespace: usize) -> Vec<QueryScope> {
    namespaces
        .iter()
        .flat_map(|ns| std::iter::repeat(Some(ns.clone())).take(threads_per_namespace))
        .collect()
}

/// Wait for every worker in `pool` to exit. A panicked worker is logged, not propagated.
pub async fn join_all(mut pool: JoinSet<()>) {
    while let Some(res) = pool.join_next().await {
        if let Err(e) = res {
            error!("worker task failed: {e}");
        }
    }
}

/// How long shutdown took after the stop signal, for logging.
pub async fn join_all_timed(pool: JoinSet<()>) -> Duration {
    let started = Instant::now();
    join_all(pool).await;
    started.elapsed()
}
