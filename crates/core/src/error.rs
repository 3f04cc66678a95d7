//! Error types shared across Anvil crates.
//!
//! Crates that own a backend define their own `thiserror` enum next to it
//! (file store, key-value store, shell, config, sandbox). The two here cross
//! crate boundaries: collaborators report [`ProviderError`] and every tool
//! adapter reports [`ToolError`].

use thiserror::Error;

/// Failure talking to a model, encyclopedia or vision service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether retrying the same request later can succeed.
    ///
    /// Authentication and configuration failures are permanent for the
    /// lifetime of a run; everything else is worth another turn.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)
        )
    }
}

/// Errors raised while invoking a tool.
///
/// None of these escape the dispatcher: they are rendered into the text fed
/// back to the model as `Error: {self}`.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A backend refused the request (missing file, write-once clash, ...).
    #[error("{tool_name}: {reason}")]
    Resource { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
