use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use vecload_common::{
    DeleteRequest, ErrorResponse, IndexStats, IndexTarget, QueryRequest, QueryResponse, Result,
    UpsertRequest, UpsertResponse, VecLoadError, Vector, VectorIndex, MAX_TOP_K, MAX_UPSERT_BATCH,
};

/// Data-plane API version sent with every request.
pub const API_VERSION: &str = "2024-07";

/// Vector-index client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub target: IndexTarget,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(target: IndexTarget) -> Self {
        Self { target, request_timeout: None }
    }
}

/// Vector-index data-plane client. Cheap to share behind an `Arc`; the
/// underlying connection pool is safe for concurrent use.
pub struct Client {
    pub config: ClientConfig,
    /// Normalised `scheme://host` prefix all request paths are appended to.
    base_url: String,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| VecLoadError::InvalidConfig(e.to_string()))?;
        let base_url = normalize_host(&config.target.host)?;
        Ok(Self { config, base_url, http_client })
    }

    /// Build the URL for a data-plane path, e.g. `/query`.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.build_url(path);

        let response = self
            .http_client
            .post(&url)
            .header("Api-Key", &self.config.target.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| VecLoadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VecLoadError::NetworkError(e.to_string()))?;

        // Some endpoints answer with an empty body rather than `{}`.
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) { b"{}" } else { &bytes };

        serde_json::from_slice(bytes).map_err(|e| VecLoadError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl VectorIndex for Client {
    async fn upsert(&self, vectors: &[Vector], namespace: Option<&str>) -> Result<u64> {
        if vectors.is_empty() {
            return Ok(0);
        }
        if vectors.len() > MAX_UPSERT_BATCH {
            return Err(VecLoadError::BatchTooLarge(MAX_UPSERT_BATCH));
        }

        let request = UpsertRequest {
            vectors: vectors.to_vec(),
            namespace: namespace.map(str::to_string),
        };
        let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
        Ok(response.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: u32, namespace: Option<&str>) -> Result<QueryResponse> {
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(VecLoadError::InvalidTopK(top_k));
        }

        let request = QueryRequest {
            vector: vector.to_vec(),
            top_k,
            namespace: namespace.map(str::to_string),
            include_values: false,
            include_metadata: false,
        };
        self.post("/query", &request).await
    }

    async fn describe_index_stats(&self) -> Result<IndexStats> {
        self.post("/describe_index_stats", &serde_json::json!({})).await
    }

    async fn delete(&self, delete_all: bool, namespace: Option<&str>) -> Result<()> {
        let request = DeleteRequest { delete_all, namespace: namespace.map(str::to_string) };
        let _: serde_json::Value = self.post("/vectors/delete", &request).await?;
        Ok(())
    }
}

/// Turn a configured host into a `scheme://host` prefix. Bare hosts get `https://`.
pub fn normalize_host(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(VecLoadError::InvalidConfig("index host is required".to_string()));
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        Ok(host.to_string())
    } else {
        Ok(format!("https://{}", host))
    }
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> VecLoadError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .ok()
        .and_then(ErrorResponse::into_message)
        .unwrap_or_else(|| format!("Server returned status: {}", status));

    VecLoadError::HttpError(status.as_u16(), error_msg)
}
