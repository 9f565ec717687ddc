//! Shared constants/defaults for things
//!

/// Default upstream API root for the hosted model.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for the structured scalp assessment.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";

/// Model used for the hair-restoration preview edit.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Header carrying the upstream API key.
pub const X_GOOG_API_KEY: &str = "x-goog-api-key";

/// Images wider than this are scaled down before upload.
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 1024;

/// JPEG quality used when re-encoding uploads (0.8).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Quota failures are retried this many times after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff delay in milliseconds, doubled on each retry.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2000;

/// Largest request body accepted by the API, data URIs are big.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// In-flight session flows older than this are considered abandoned.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 300;

/// Sessions untouched for this many seconds expire.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

/// How often expired sessions are purged from memory.
pub const SESSION_PURGE_INTERVAL_SECS: u64 = 60;

/// Allowed relative drift between distribution counts and total grafts before we warn.
pub const GRAFT_DISTRIBUTION_TOLERANCE: f64 = 0.10;

/// Session key holding the serialized flow state.
pub const SESSION_FLOW_KEY: &str = "flow";
