use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Dimension of every synthetic vector unless overridden.
pub const VECTOR_DIMENSION: usize = 1_024;
/// Vectors per upsert call. The service's recommended batch size.
pub const BATCH_SIZE: usize = 100;
/// Hard upper bound on vectors accepted by a single upsert call.
pub const MAX_UPSERT_BATCH: usize = 1_000;
/// Hard upper bound on `top_k` accepted by a single query call.
pub const MAX_TOP_K: u32 = 10_000;

pub const DEFAULT_WRITE_THREADS: usize = 10;
pub const DEFAULT_READ_THREADS: usize = 20;
pub const DEFAULT_THREADS_PER_NAMESPACE: usize = 4;
pub const DEFAULT_TOP_K: u32 = 10;

/// Error types for vector-index operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VecLoadError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Batch exceeds maximum size of {0} vectors")]
    BatchTooLarge(usize),

    #[error("top_k must be between 1 and 10000, got {0}")]
    InvalidTopK(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for vector-index operations
pub type Result<T> = std::result::Result<T, VecLoadError>;

/// JSON error envelope. The data plane uses `message`, older deployments `error`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), error: None }
    }

    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// Where the index lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTarget {
    /// Data-plane host, with or without scheme.
    pub host: String,
    /// Sent verbatim in the `Api-Key` header.
    #[serde(default)]
    pub api_key: String,
}

/// A single record in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub vectors: Vec<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    #[serde(default)]
    pub upserted_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub include_values: bool,
    #[serde(default)]
    pub include_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredVector {
    pub id: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<ScoredVector>,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub delete_all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Response of `describe_index_stats`. Absent fields decode to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub dimension: usize,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl IndexStats {
    /// Namespace names in sorted order. The default namespace is `""`.
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.keys().cloned().collect()
    }
}

/// The capability set a load test drives. Implementations must tolerate
/// concurrent calls on one shared handle.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write a batch; returns the number of vectors the service accepted.
    async fn upsert(&self, vectors: &[Vector], namespace: Option<&str>) -> Result<u64>;

    /// Nearest-neighbour read.
    async fn query(&self, vector: &[f32], top_k: u32, namespace: Option<&str>) -> Result<QueryResponse>;

    async fn describe_index_stats(&self) -> Result<IndexStats>;

    async fn delete(&self, delete_all: bool, namespace: Option<&str>) -> Result<()>;
}
