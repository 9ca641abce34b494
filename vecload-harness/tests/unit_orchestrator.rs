mod common;

use common::FakeIndex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vecload_common::VecLoadError;
use vecload_harness::config::{DeleteParams, FullParams, ReadParams, RunContext, StormParams, WriteParams};
use vecload_harness::orchestrator::{
    run_delete_all, run_full_test, run_read_test, run_storm_test, run_write_test, stats_snapshot, DeleteReport,
    RunState, StormOutcome,
};

fn quiet() -> RunContext {
    RunContext { show_progress: false, progress_interval: Duration::from_millis(50), ..RunContext::default() }
}

fn write_params(num_vectors: u64) -> WriteParams {
    WriteParams { num_vectors, num_threads: 4, batch_size: 100, dimension: 8, namespace: None }
}

fn read_params(duration: Duration, num_threads: usize) -> ReadParams {
    ReadParams { duration, num_threads, top_k: 10, dimension: 8 }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_write_upserts_all_vectors() {
    let index = Arc::new(FakeIndex::new());
    let report = run_write_test(Arc::clone(&index), &write_params(250), &quiet()).await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.requested_vectors, 250);
    assert_eq!(report.total_batches, 3);
    assert_eq!(report.vectors_upserted, 250);
    assert_eq!(report.summary.operations, 3);
    assert_eq!(report.summary.errors, 0);
    assert!(report.summary.latency.is_some());

    let mut sizes = index.batch_sizes.lock().clone();
    sizes.sort();
    assert_eq!(sizes, [50, 100, 100]);
    assert_eq!(index.total_vectors.load(Ordering::SeqCst), 250);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_write_with_failures_counts_only_successful_batches() {
    let index = Arc::new(FakeIndex { fail_upsert_ids: vec!["vec-0".to_string()], ..FakeIndex::new() });
    let report = run_write_test(index, &write_params(300), &quiet()).await.unwrap();

    assert_eq!(report.vectors_upserted, 200);
    assert_eq!(report.summary.operations, 2);
    assert_eq!(report.summary.errors, 1);
}

#[tokio::test]
async fn test_write_rejects_invalid_params_before_any_call() {
    let index = Arc::new(FakeIndex::new());
    let params = WriteParams { batch_size: 0, ..write_params(100) };
    let err = run_write_test(Arc::clone(&index), &params, &quiet()).await.unwrap_err();

    assert!(matches!(err, VecLoadError::InvalidConfig(_)));
    assert_eq!(index.upsert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_runs_for_duration_then_stops() {
    let index = Arc::new(FakeIndex::with_latency(Duration::from_millis(5)));
    let started = Instant::now();
    let report = run_read_test(Arc::clone(&index), &read_params(Duration::from_secs(2), 5), &quiet())
        .await
        .unwrap();
    let wall = started.elapsed();

    assert_eq!(report.state, RunState::Completed);
    assert!(wall >= Duration::from_secs(2));
    assert!(wall < Duration::from_secs(4), "read test overran: {wall:?}");
    assert_eq!(report.threads, 5);
    assert!(report.summary.operations > 0);
    assert_eq!(report.summary.operations, index.queries_for(None));
    assert!(report.summary.elapsed_secs >= 2.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_cancelled_early() {
    let index = Arc::new(FakeIndex::with_latency(Duration::from_millis(2)));
    let ctx = quiet();
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let report = run_read_test(index, &read_params(Duration::from_secs(30), 3), &ctx).await.unwrap();

    assert_eq!(report.state, RunState::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_read_rejects_bad_top_k() {
    let index = Arc::new(FakeIndex::new());
    let params = ReadParams { top_k: 0, ..read_params(Duration::from_millis(100), 1) };
    let err = run_read_test(Arc::clone(&index), &params, &quiet()).await.unwrap_err();

    assert_eq!(err, VecLoadError::InvalidTopK(0));
    assert_eq!(index.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_storm_with_no_namespaces_launches_nothing() {
    let index = Arc::new(FakeIndex::new());
    let params = StormParams { duration: Duration::from_millis(200), threads_per_namespace: 4, top_k: 10, dimension: 8 };
    let outcome = run_storm_test(Arc::clone(&index), &params, &quiet()).await.unwrap();

    assert_eq!(outcome, StormOutcome::NoNamespaces);
    assert_eq!(index.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_storm_queries_every_namespace() {
    let index = Arc::new(FakeIndex {
        latency: Duration::from_millis(2),
        ..FakeIndex::with_namespaces(&[("", 10), ("alpha", 20), ("beta", 30)])
    });
    let params = StormParams { duration: Duration::from_millis(400), threads_per_namespace: 2, top_k: 5, dimension: 8 };
    let outcome = run_storm_test(Arc::clone(&index), &params, &quiet()).await.unwrap();

    let StormOutcome::Completed(report) = outcome else {
        panic!("expected a completed storm");
    };
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.namespaces, 3);
    assert_eq!(report.total_threads, 6);
    assert_eq!(report.total_vectors, 60);
    assert_eq!(report.per_namespace.len(), 3);

    for row in &report.per_namespace {
        assert_eq!(row.queries, index.queries_for(Some(&row.namespace)), "namespace {:?}", row.namespace);
    }
    let sum: u64 = report.per_namespace.iter().map(|r| r.queries).sum();
    assert_eq!(sum, report.summary.operations);
    let sorted = report.per_namespace.windows(2).all(|w| w[0].queries >= w[1].queries);
    assert!(sorted);
}

#[tokio::test]
async fn test_storm_propagates_stats_failure() {
    let index = Arc::new(FakeIndex { stats_unavailable: true, ..FakeIndex::new() });
    let err = run_storm_test(index, &StormParams::default(), &quiet()).await.unwrap_err();
    assert!(matches!(err, VecLoadError::NetworkError(_)));
}

#[tokio::test]
async fn test_delete_on_empty_index_is_noop() {
    let index = FakeIndex::new();
    let params = DeleteParams { namespace: None, settle: Duration::ZERO };
    let report = run_delete_all(&index, &params, &quiet()).await.unwrap();

    assert_eq!(report, DeleteReport::NothingToDelete);
    assert_eq!(index.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_delete_reports_before_and_after() {
    let index = FakeIndex::with_namespaces(&[("", 500)]);
    let params = DeleteParams { namespace: None, settle: Duration::from_millis(10) };
    let report = run_delete_all(&index, &params, &quiet()).await.unwrap();

    let DeleteReport::Deleted { vectors_before, vectors_remaining, delete_secs } = report else {
        panic!("expected a delete");
    };
    assert_eq!(vectors_before, 500);
    assert_eq!(vectors_remaining, 0);
    assert!(delete_secs >= 0.0);
    assert_eq!(index.delete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delete_reports_residual_vectors() {
    let index = FakeIndex { residual_after_delete: 7, ..FakeIndex::with_namespaces(&[("", 100)]) };
    let params = DeleteParams { namespace: None, settle: Duration::ZERO };
    let report = run_delete_all(&index, &params, &quiet()).await.unwrap();

    assert!(matches!(report, DeleteReport::Deleted { vectors_remaining: 7, .. }));
}

#[tokio::test]
async fn test_delete_scoped_to_namespace_counts_only_that_namespace() {
    let index = FakeIndex::with_namespaces(&[("a", 100), ("b", 100)]);
    let params = DeleteParams { namespace: Some("a".to_string()), settle: Duration::ZERO };
    let report = run_delete_all(&index, &params, &quiet()).await.unwrap();

    let DeleteReport::Deleted { vectors_before, vectors_remaining, .. } = report else {
        panic!("expected a delete");
    };
    assert_eq!(vectors_before, 100);
    assert_eq!(vectors_remaining, 0);
    assert_eq!(index.total_vectors.load(Ordering::SeqCst), 100, "namespace b untouched");
    assert!(index.namespaces.lock().contains_key("b"));
}

#[tokio::test]
async fn test_delete_on_empty_namespace_is_noop() {
    let index = FakeIndex::with_namespaces(&[("a", 100), ("b", 100)]);
    let params = DeleteParams { namespace: Some("empty".to_string()), settle: Duration::ZERO };
    let report = run_delete_all(&index, &params, &quiet()).await.unwrap();

    assert_eq!(report, DeleteReport::NothingToDelete);
    assert_eq!(index.delete_calls.load(Ordering::SeqCst), 0);
    assert_eq!(index.total_vectors.load(Ordering::SeqCst), 200);
}

#[tokio::test]
async fn test_stats_snapshot() {
    let index = FakeIndex::with_namespaces(&[("a", 3), ("b", 4)]);
    let stats = stats_snapshot(&index).await.unwrap();
    assert_eq!(stats.total_vector_count, 7);
    assert_eq!(stats.namespace_names(), ["a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_run_write_read_delete() {
    let index = Arc::new(FakeIndex::with_latency(Duration::from_millis(1)));
    let params = FullParams {
        write: write_params(200),
        read: read_params(Duration::from_millis(300), 2),
        settle: Duration::ZERO,
        delete_after: true,
        delete: DeleteParams { namespace: None, settle: Duration::ZERO },
    };
    let report = run_full_test(Arc::clone(&index), &params, &quiet()).await.unwrap();

    assert_eq!(report.write.vectors_upserted, 200);
    assert_eq!(report.stats_after_write.as_ref().map(|s| s.total_vector_count), Some(200));
    let read = report.read.expect("read phase ran");
    assert_eq!(read.state, RunState::Completed);
    assert!(read.summary.operations > 0);
    assert!(matches!(report.delete, Some(DeleteReport::Deleted { vectors_before: 200, .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_run_keeps_vectors_without_delete_after() {
    let index = Arc::new(FakeIndex::new());
    let params = FullParams {
        write: write_params(100),
        read: read_params(Duration::from_millis(100), 1),
        settle: Duration::ZERO,
        ..FullParams::default()
    };
    let report = run_full_test(Arc::clone(&index), &params, &quiet()).await.unwrap();

    assert!(report.delete.is_none());
    assert_eq!(index.delete_calls.load(Ordering::SeqCst), 0);
    assert_eq!(index.total_vectors.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn test_full_run_cancelled_stops_after_write() {
    let index = Arc::new(FakeIndex::new());
    let ctx = quiet();
    ctx.cancel.cancel();
    let params = FullParams { write: write_params(500), ..FullParams::default() };
    let report = run_full_test(Arc::clone(&index), &params, &ctx).await.unwrap();

    assert_eq!(report.write.state, RunState::Cancelled);
    assert_eq!(report.write.vectors_upserted, 0);
    assert!(report.read.is_none());
    assert_eq!(index.upsert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(index.query_calls.load(Ordering::SeqCst), 0);
}
