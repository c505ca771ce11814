//! Error types for the studybot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all studybot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Manifest errors ---
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    // --- Index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Malformed generation: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The per-course source manifest could not be used.
///
/// Synchronization for the affected course aborts without persisting.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found at {path}")]
    Missing { path: PathBuf },

    #[error("Failed to read manifest at {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Malformed manifest at {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// Durable write of index state failed. The in-memory index must not be
    /// treated as synchronized; the whole pass has to be retried.
    #[error("Failed to persist index at {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("Persisted index at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("No index has been built for course '{0}'")]
    NotBuilt(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
