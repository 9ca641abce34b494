use std::time::Duration;

/// Maximum time to wait when acquiring the index's read or write lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Header carrying the caller's API key. Requests without it get 401.
pub const API_KEY_HEADER: &str = "api-key";

/// Request bodies above this size are rejected before parsing.
/// A full 1,000 x 1,024 batch encodes to roughly 12 MB of JSON.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
