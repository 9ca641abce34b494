use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vecload_common::{
    Result, VecLoadError, BATCH_SIZE, DEFAULT_READ_THREADS, DEFAULT_THREADS_PER_NAMESPACE,
    DEFAULT_TOP_K, DEFAULT_WRITE_THREADS, MAX_TOP_K, MAX_UPSERT_BATCH, VECTOR_DIMENSION,
};

pub const DEFAULT_NUM_VECTORS: u64 = 10_000;
pub const DEFAULT_READ_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_STORM_DURATION: Duration = Duration::from_secs(60);
/// Pause after a write so the index can make new vectors queryable.
pub const POST_WRITE_SETTLE: Duration = Duration::from_secs(5);
/// Pause after a write-only run before the stats snapshot.
pub const WRITE_ONLY_SETTLE: Duration = Duration::from_secs(2);
/// Pause after delete-all before re-reading the vector count.
pub const POST_DELETE_SETTLE: Duration = Duration::from_secs(2);
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Ambient settings shared by every orchestrator in one invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Cancelled by the operator (Ctrl-C). Runs observe it and stop early.
    pub cancel: CancellationToken,
    /// Print the live progress line.
    pub show_progress: bool,
    pub progress_interval: Duration,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            show_progress: true,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteParams {
    pub num_vectors: u64,
    pub num_threads: usize,
    pub batch_size: usize,
    pub dimension: usize,
    pub namespace: Option<String>,
}

impl Default for WriteParams {
    fn default() -> Self {
        Self {
            num_vectors: DEFAULT_NUM_VECTORS,
            num_threads: DEFAULT_WRITE_THREADS,
            batch_size: BATCH_SIZE,
            dimension: VECTOR_DIMENSION,
            namespace: None,
        }
    }
}

impl WriteParams {
    pub fn validate(&self) -> Result<()> {
        require_threads(self.num_threads, "write threads")?;
        require_dimension(self.dimension)?;
        if self.batch_size == 0 || self.batch_size > MAX_UPSERT_BATCH {
            return Err(VecLoadError::InvalidConfig(format!(
                "batch size must be between 1 and {MAX_UPSERT_BATCH}, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadParams {
    pub duration: Duration,
    pub num_threads: usize,
    pub top_k: u32,
    pub dimension: usize,
}

impl Default for ReadParams {
    fn default() -> Self {
        Self {
            duration: DEFAULT_READ_DURATION,
            num_threads: DEFAULT_READ_THREADS,
            top_k: DEFAULT_TOP_K,
            dimension: VECTOR_DIMENSION,
        }
    }
}

impl ReadParams {
    pub fn validate(&self) -> Result<()> {
        require_threads(self.num_threads, "read threads")?;
        require_dimension(self.dimension)?;
        require_top_k(self.top_k)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StormParams {
    pub duration: Duration,
    pub threads_per_namespace: usize,
    pub top_k: u32,
    pub dimension: usize,
}

impl Default for StormParams {
    fn default() -> Self {
        Self {
            duration: DEFAULT_STORM_DURATION,
            threads_per_namespace: DEFAULT_THREADS_PER_NAMESPACE,
            top_k: DEFAULT_TOP_K,
            dimension: VECTOR_DIMENSION,
        }
    }
}

impl StormParams {
    pub fn validate(&self) -> Result<()> {
        require_threads(self.threads_per_namespace, "threads per namespace")?;
        require_dimension(self.dimension)?;
        require_top_k(self.top_k)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteParams {
    /// Namespace to clear; `None` is the default namespace.
    pub namespace: Option<String>,
    pub settle: Duration,
}

impl Default for DeleteParams {
    fn default() -> Self {
        Self { namespace: None, settle: POST_DELETE_SETTLE }
    }
}

/// Write, settle, snapshot, read, then optionally delete.
#[derive(Debug, Clone, PartialEq)]
pub struct FullParams {
    pub write: WriteParams,
    pub read: ReadParams,
    pub settle: Duration,
    pub delete_after: bool,
    pub delete: DeleteParams,
}

impl Default for FullParams {
    fn default() -> Self {
        Self {
            write: WriteParams::default(),
            read: ReadParams::default(),
            settle: POST_WRITE_SETTLE,
            delete_after: false,
            delete: DeleteParams::default(),
        }
    }
}

impl FullParams {
    pub fn validate(&self) -> Result<()> {
        self.write.validate()?;
        self.read.validate()
    }
}

fn require_threads(n: usize, what: &str) -> Result<()> {
    if n == 0 {
        return Err(VecLoadError::InvalidConfig(format!("{what} must be at least 1")));
    }
    Ok(())
}

fn require_dimension(dimension: usize) -> Result<()> {
    if dimension == 0 {
        return Err(VecLoadError::InvalidConfig("dimension must be at least 1".to_string()));
    }
    Ok(())
}

fn require_top_k(top_k: u32) -> Result<()> {
    if top_k == 0 || top_k > MAX_TOP_K {
        return Err(VecLoadError::InvalidTopK(top_k));
    }
    Ok(())
}
