//! Provider error taxonomy with retry classification.
//!
//! | Variant             | Retried |
//! |---------------------|---------|
//! | `RateLimited`       | yes     |
//! | `ServerError` (5xx) | yes     |
//! | `Timeout`           | yes     |
//! | `Connection`        | yes     |
//! | `Unavailable`       | no      |
//! | `Rejected`          | no      |
//! | `MalformedResponse` | no      |

use std::time::Duration;

use thiserror::Error;

/// Longest response body kept in an error message.
const MAX_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No credential configured. Raised before any network call.
    #[error("{provider}: API key not configured")]
    Unavailable { provider: String },

    #[error("{provider}: call timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    #[error("{provider}: rate limited (HTTP {status}): {body}")]
    RateLimited {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: server error (HTTP {status}): {body}")]
    ServerError {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: connection failed: {reason}")]
    Connection { provider: String, reason: String },

    /// Any other non-success status.
    #[error("{provider}: request rejected (HTTP {status}): {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: malformed response: {reason}")]
    MalformedResponse { provider: String, reason: String },
}

impl ProviderError {
    /// Whether the call may be retried under the call policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::Timeout { .. }
                | Self::Connection { .. }
        )
    }

    /// Name of the provider that produced this error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider }
            | Self::Timeout { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::ServerError { provider, .. }
            | Self::Connection { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::MalformedResponse { provider, .. } => provider,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        let provider = provider.to_string();
        let body = truncate(body);
        match status {
            429 => Self::RateLimited {
                provider,
                status,
                body,
            },
            500..=599 => Self::ServerError {
                provider,
                status,
                body,
            },
            _ => Self::Rejected {
                provider,
                status,
                body,
            },
        }
    }

    /// Classify a transport-level failure reported by reqwest.
    pub fn from_transport(provider: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                provider: provider.to_string(),
                after: Duration::ZERO,
            };
        }
        if let Some(status) = err.status() {
            return Self::from_status(provider, status.as_u16(), &err.to_string());
        }
        Self::Connection {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;
