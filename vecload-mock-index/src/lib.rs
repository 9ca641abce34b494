use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info};
use vecload_common::{
    DeleteRequest, ErrorResponse, IndexStats, NamespaceStats, QueryRequest, QueryResponse, ScoredVector,
    UpsertRequest, UpsertResponse, MAX_TOP_K, MAX_UPSERT_BATCH,
};

pub mod config;
use config::{API_KEY_HEADER, LOCK_TIMEOUT, MAX_BODY_BYTES};

/// `namespace → id → values`. The default namespace is `""`.
#[derive(Debug, Default)]
pub struct IndexState {
    pub namespaces: BTreeMap<String, HashMap<String, Vec<f32>>>,
}

impl IndexState {
    pub fn total_vector_count(&self) -> u64 {
        self.namespaces.values().map(|ns| ns.len() as u64).sum()
    }
}

pub type Db = Arc<RwLock<IndexState>>;

/// Scripted misbehaviour applied to every authenticated request.
#[derive(Debug, Default)]
pub struct Faults {
    /// Every Nth request fails with 503. `0` disables.
    pub fail_every: u64,
    /// Added before each request is handled.
    pub latency: Duration,
    requests: AtomicU64,
}

impl Faults {
    pub fn new(fail_every: u64, latency: Duration) -> Self {
        Self { fail_every, latency, requests: AtomicU64::new(0) }
    }

    /// Count one request and report whether it should fail.
    fn should_fail(&self) -> bool {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.fail_every > 0 && n % self.fail_every == 0
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub dimension: usize,
    pub faults: Arc<Faults>,
}

impl AppState {
    pub fn new(dimension: usize, faults: Faults) -> Self {
        Self { db: Arc::new(RwLock::new(IndexState::default())), dimension, faults: Arc::new(faults) }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub dimension: usize,
    pub fail_every: u64,
    pub latency: Duration,
}

/// In-memory stand-in for a vector index data plane.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/vectors/upsert", post(handle_upsert))
            .route("/query", post(handle_query))
            .route("/describe_index_stats", post(handle_describe_index_stats))
            .route("/vectors/delete", post(handle_delete))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let faults = Faults::new(self.config.fail_every, self.config.latency);
        let state = AppState::new(self.config.dimension, faults);
        let app = Self::create_router(state);
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, dimension = self.config.dimension, "mock index bound");
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn lock_timeout_response() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Server error: Lock acquisition timed out")
}

/// Authenticate, apply the configured latency, then roll for an injected failure.
async fn admit(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if !headers.contains_key(API_KEY_HEADER) {
        return Err(error_response(StatusCode::UNAUTHORIZED, "Missing Api-Key header"));
    }
    if !state.faults.latency.is_zero() {
        tokio::time::sleep(state.faults.latency).await;
    }
    if state.faults.should_fail() {
        debug!("injecting failure");
        return Err(error_response(StatusCode::SERVICE_UNAVAILABLE, "Injected failure"));
    }
    Ok(())
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Malformed request body: {e}")))
}

fn check_dimension(expected: usize, actual: usize) -> Result<(), Response> {
    if expected != actual {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Vector dimension {actual} does not match the dimension of the index {expected}"),
        ));
    }
    Ok(())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Handler for POST /vectors/upsert: inserts or overwrites every vector in the batch.
pub async fn handle_upsert(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(r) = admit(&state, &headers).await {
        return r;
    }
    let request: UpsertRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(r) => return r,
    };

    if request.vectors.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Upsert request must contain at least one vector");
    }
    if request.vectors.len() > MAX_UPSERT_BATCH {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Batch size exceeds the maximum of {MAX_UPSERT_BATCH} vectors"),
        );
    }
    for v in &request.vectors {
        if let Err(r) = check_dimension(state.dimension, v.values.len()) {
            return r;
        }
    }

    let mut db_guard = match timeout(LOCK_TIMEOUT, state.db.write()).await {
        Ok(guard) => guard,
        Err(_) => return lock_timeout_response(),
    };

    let upserted_count = request.vectors.len() as u64;
    let namespace = db_guard.namespaces.entry(request.namespace.unwrap_or_default()).or_default();
    for v in request.vectors {
        namespace.insert(v.id, v.values);
    }

    (StatusCode::OK, Json(UpsertResponse { upserted_count })).into_response()
}

/// Handler for POST /query: scores every vector in the namespace by dot product
/// and returns the best `topK`.
pub async fn handle_query(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(r) = admit(&state, &headers).await {
        return r;
    }
    let request: QueryRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(r) => return r,
    };

    if request.top_k == 0 || request.top_k > MAX_TOP_K {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("topK must be between 1 and {MAX_TOP_K}, got {}", request.top_k),
        );
    }
    if let Err(r) = check_dimension(state.dimension, request.vector.len()) {
        return r;
    }

    let db_guard = match timeout(LOCK_TIMEOUT, state.db.read()).await {
        Ok(guard) => guard,
        Err(_) => return lock_timeout_response(),
    };

    let namespace = request.namespace.unwrap_or_default();
    let mut matches: Vec<ScoredVector> = db_guard
        .namespaces
        .get(&namespace)
        .map(|vectors| {
            vectors
                .iter()
                .map(|(id, values)| ScoredVector { id: id.clone(), score: dot(&request.vector, values) })
                .collect()
        })
        .unwrap_or_default();
    drop(db_guard);

    matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    matches.truncate(request.top_k as usize);

    (StatusCode::OK, Json(QueryResponse { matches, namespace })).into_response()
}

/// Handler for POST /describe_index_stats: vector counts for the index and
/// every non-empty namespace.
pub async fn handle_describe_index_stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(r) = admit(&state, &headers).await {
        return r;
    }

    let db_guard = match timeout(LOCK_TIMEOUT, state.db.read()).await {
        Ok(guard) => guard,
        Err(_) => return lock_timeout_response(),
    };

    let namespaces = db_guard
        .namespaces
        .iter()
        .filter(|(_, vectors)| !vectors.is_empty())
        .map(|(name, vectors)| (name.clone(), NamespaceStats { vector_count: vectors.len() as u64 }))
        .collect();
    let stats = IndexStats {
        total_vector_count: db_guard.total_vector_count(),
        dimension: state.dimension,
        namespaces,
    };

    (StatusCode::OK, Json(stats)).into_response()
}

/// Handler for POST /vectors/delete: only `deleteAll` is supported. Clearing
/// an absent namespace is a no-op.
pub async fn handle_delete(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(r) = admit(&state, &headers).await {
        return r;
    }
    let request: DeleteRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(r) => return r,
    };
    if !request.delete_all {
        return error_response(StatusCode::BAD_REQUEST, "Only deleteAll is supported");
    }

    let mut db_guard = match timeout(LOCK_TIMEOUT, state.db.write()).await {
        Ok(guard) => guard,
        Err(_) => return lock_timeout_response(),
    };
    db_guard.namespaces.remove(&request.namespace.unwrap_or_default());

    (StatusCode::OK, Json(json!({}))).into_response()
}
