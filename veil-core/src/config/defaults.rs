// Single source of truth for all default values.

// --- Retrieval ---
pub const DEFAULT_TOP_K: usize = 8;
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

// --- Context ---
pub const DEFAULT_TOKEN_BUDGET: usize = 2_000;
pub const DEFAULT_CITABLE_SHARE: f64 = 0.6;
pub const DEFAULT_MARKER_PREFIX: &str = "CITABLE";

// --- Generation ---
pub const DEFAULT_STREAM_CHANNEL_CAPACITY: usize = 1;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_HISTORY_TURNS: usize = 6;
pub const DEFAULT_STREAM_PROVISIONAL_TOKENS: bool = true;
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I'm sorry, I can't share that. Is there something else I can help you with?";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1_024;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// --- Resilience ---
pub const DEFAULT_EMBEDDING_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_INDEX_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_FIRST_TOKEN_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_TOKEN_IDLE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_COOLDOWN_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 100;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 2_000;

// --- Embeddings ---
pub const DEFAULT_EMBEDDING_PROVIDER: &str = "hashing";
pub const DEFAULT_EMBEDDING_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_EMBEDDING_CACHE_TTL_SECS: u64 = 3_600;

// --- Audit ---
pub const DEFAULT_NGRAM_SIZE: usize = 5;
pub const DEFAULT_MIN_FINGERPRINT_CHARS: usize = 12;
pub const DEFAULT_MIN_DISTINCTIVE_TOKEN_CHARS: usize = 6;

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "veil.db";
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = false;
