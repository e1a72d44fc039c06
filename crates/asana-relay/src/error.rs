//! Error types for the relay.

use thiserror::Error;

/// Errors returned by calls to the Asana API.
///
/// Every failure a rule or the webhook lifecycle can hit ends up here, and
/// all of them are treated the same way by callers: logged and swallowed.
#[derive(Debug, Error)]
pub enum AsanaError {
    /// Transport-level failure (connection refused, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not complete within the configured timeout.
    #[error("request to {path} timed out")]
    Timeout { path: String },

    /// Asana answered with a non-success status.
    #[error("Asana API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The access token cannot be sent as a header value.
    #[error("access token contains characters not allowed in a header")]
    InvalidToken,

    /// The response body did not match the expected shape.
    #[error("failed to decode Asana response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AsanaError {
    /// Whether this error means the resource no longer exists upstream.
    ///
    /// Common when a task or section is deleted between the event being
    /// emitted and the relay processing it.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
