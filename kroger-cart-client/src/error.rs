//! Client error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading local configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("Could not open {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not the expected JSON.
    #[error("Could not decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is absent or empty.
    #[error("Missing {field} in {}", .path.display())]
    Missing { path: PathBuf, field: &'static str },
}

/// Errors from the cart API.
#[derive(Debug, Error)]
pub enum CartError {
    /// The item has no preset product identifier.
    #[error("No preset product ID for item: {0}")]
    UnknownItem(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Unexpected response: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
