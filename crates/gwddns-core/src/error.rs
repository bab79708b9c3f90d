//! Errors shared by the reconciler, the watcher and their plug-ins

use thiserror::Error;

/// `Result` with [`Error`] as the error type
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a reconciliation or watch cycle can report
#[derive(Error, Debug)]
pub enum Error {
    /// Platform adapter errors (config parsing, probe reads, interface listing)
    #[error("Platform error: {0}")]
    Platform(String),

    /// DNS publisher errors
    #[error("DNS publisher error: {0}")]
    Publisher(String),

    /// Persisted-state read or write failures
    #[error("State store error: {0}")]
    StateStore(String),

    /// Cache marker write errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(String),

    /// Invalid or missing settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from publisher APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credentials rejected by the publisher API
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Publisher API answered with an unexpected status
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Publisher name
        provider: String,
        /// Status and response body
        message: String,
    },

    /// Anything else, already formatted
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a platform adapter error
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    /// Create a DNS publisher error
    pub fn publisher(msg: impl Into<String>) -> Self {
        Self::Publisher(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a cache marker error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
