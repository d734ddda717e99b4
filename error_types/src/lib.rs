//! Unified error types for the discovery-and-scoring pipeline.
//!
//! Each stage of the pipeline (config, adapters, LLM client, storage) owns a
//! small `thiserror` enum; [`CoreError`] unifies them for callers that only
//! ever report, never match on, a specific failure.

use thiserror::Error;

/// Configuration loading and validation errors. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid configuration value: {0} = {1}")]
    InvalidValue(String, String),

    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("unknown adapter name: {0}")]
    UnknownAdapter(String),
}

/// Source-adapter ingestion errors. Transient transport errors are retried
/// with backoff inside the adapter; this variant is surfaced only once the
/// adapter gives up.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("request to upstream failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("response could not be parsed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("platform-specific error: {0}")]
    PlatformError(String),
}

/// LLM client transport/parsing errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to LLM provider failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("LLM provider returned an error status: {0}")]
    ProviderError(String),

    #[error("LLM reply did not contain a usable completion")]
    EmptyCompletion,

    #[error("failed to parse LLM reply as JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Structured-output parse failures from the Pain Analyzer. The analyzer
/// never propagates these; they exist so the repair/fail-open logic has a
/// typed error to convert into a zero-score `PainScore`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("llm call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("reply was not valid JSON: {0}")]
    MalformedReply(String),
}

/// Persistence errors. Surfaced to the caller; the orchestrator continues
/// with in-memory results for the affected (adapter, target) pair.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to (de)serialize a JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

/// Unified error type for callers that cross stage boundaries (e.g. the
/// orchestrator) and only need to log-and-continue.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}
