//! Error types for the login flow.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that end an authentication session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required configuration is absent or unusable.
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// The loopback callback endpoint could not be bound.
    #[error("Failed to start callback listener on {addr}: {source}")]
    ListenerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The callback listener stopped before delivering a result.
    #[error("Callback listener failed: {0}")]
    Listener(#[source] std::io::Error),

    /// The user or the provider refused the authorization request.
    #[error("Authorization denied: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    /// The callback carried a state parameter that does not belong to this session.
    #[error("State mismatch in authorization callback")]
    StateMismatch,

    /// The callback carried neither a code nor an error.
    #[error("Authorization callback did not include a code")]
    MissingCode,

    /// No callback arrived before the deadline.
    #[error("Timed out after {0:?} waiting for the authorization callback")]
    Timeout(Duration),

    /// The caller cancelled the session.
    #[error("Authentication cancelled")]
    Cancelled,

    /// The token endpoint rejected or failed the code exchange.
    #[error("Token exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    /// The OS random source failed while generating the state nonce.
    #[error("Failed to generate state nonce: {0}")]
    Random(getrandom::Error),
}

/// Errors from the token endpoint.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Reasons a cached credential could not be read. All of them mean "cache miss".
#[derive(Debug, Error)]
pub enum TokenLoadError {
    #[error("No cached token at {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("Failed to read cached token at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed cached token at {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to write the credential file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to write token file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure to hand a URL to the desktop browser.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to open browser: {0}")]
    Open(#[source] std::io::Error),
}
