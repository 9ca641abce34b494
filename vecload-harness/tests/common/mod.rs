#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use vecload_common::{
    IndexStats, NamespaceStats, QueryResponse, Result, VecLoadError, Vector, VectorIndex,
};

/// In-process stand-in for the index with scripted latency and failures.
#[derive(Default)]
pub struct FakeIndex {
    /// Added to every upsert and query.
    pub latency: Duration,
    /// Upserts whose batch contains one of these ids fail.
    pub fail_upsert_ids: Vec<String>,
    /// Every Nth query fails (0 disables).
    pub fail_every_query: u64,
    /// Vectors left in the target namespace after a delete-all.
    pub residual_after_delete: u64,
    /// Fail `describe_index_stats` outright.
    pub stats_unavailable: bool,

    pub upsert_calls: AtomicU64,
    pub query_calls: AtomicU64,
    pub delete_calls: AtomicU64,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub ids: Mutex<Vec<String>>,
    pub queries_by_namespace: Mutex<HashMap<Option<String>, u64>>,
    pub namespaces: Mutex<BTreeMap<String, NamespaceStats>>,
    pub total_vectors: AtomicU64,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency, ..Self::default() }
    }

    /// Pre-populate namespaces with the given vector counts.
    pub fn with_namespaces(counts: &[(&str, u64)]) -> Self {
        let fake = Self::default();
        let mut total = 0;
        for (ns, n) in counts {
            fake.namespaces.lock().insert(ns.to_string(), NamespaceStats { vector_count: *n });
            total += n;
        }
        fake.total_vectors.store(total, Ordering::SeqCst);
        fake
    }

    pub fn queries_for(&self, namespace: Option<&str>) -> u64 {
        self.queries_by_namespace
            .lock()
            .get(&namespace.map(str::to_string))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn upsert(&self, vectors: &[Vector], namespace: Option<&str>) -> Result<u64> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if vectors.iter().any(|v| self.fail_upsert_ids.contains(&v.id)) {
            return Err(VecLoadError::HttpError(503, "injected failure".to_string()));
        }
        self.batch_sizes.lock().push(vectors.len());
        self.ids.lock().extend(vectors.iter().map(|v| v.id.clone()));
        let n = vectors.len() as u64;
        self.namespaces
            .lock()
            .entry(namespace.unwrap_or("").to_string())
            .or_default()
            .vector_count += n;
        self.total_vectors.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }

    async fn query(&self, _vector: &[f32], _top_k: u32, namespace: Option<&str>) -> Result<QueryResponse> {
        let call = self.query_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }
        if self.fail_every_query > 0 && call % self.fail_every_query == 0 {
            return Err(VecLoadError::HttpError(503, "injected failure".to_string()));
        }
        *self
            .queries_by_namespace
            .lock()
            .entry(namespace.map(str::to_string))
            .or_default() += 1;
        Ok(QueryResponse { matches: vec![], namespace: namespace.unwrap_or("").to_string() })
    }

    async fn describe_index_stats(&self) -> Result<IndexStats> {
        if self.stats_unavailable {
            return Err(VecLoadError::NetworkError("connection refused".to_string()));
        }
        Ok(IndexStats {
            total_vector_count: self.total_vectors.load(Ordering::SeqCst),
            dimension: 8,
            namespaces: self.namespaces.lock().clone(),
        })
    }

    async fn delete(&self, delete_all: bool, namespace: Option<&str>) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if delete_all {
            let namespace = namespace.unwrap_or("");
            let mut namespaces = self.namespaces.lock();
            let removed = namespaces.remove(namespace).map(|s| s.vector_count).unwrap_or(0);
            self.total_vectors.fetch_sub(removed, Ordering::SeqCst);
            if self.residual_after_delete > 0 {
                namespaces.insert(namespace.to_string(), NamespaceStats { vector_count: self.residual_after_delete });
                self.total_vectors.fetch_add(self.residual_after_delete, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}
