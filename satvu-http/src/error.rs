//! Error types for the HTTP client layer.

use std::time::Duration;

use crate::config::Backend;

/// Boxed error returned by token providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building or dispatching a request.
///
/// Transport failures carry the backend's own error as their `source`;
/// nothing here is retried or translated into a status-code error.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The built-in transport only speaks plain `http`.
    #[error("unsupported URL scheme `{0}` for the built-in transport")]
    UnsupportedScheme(String),

    /// A pre-built instance was handed to a backend that cannot use it.
    #[error("the {backend} backend cannot use a pre-built {instance} instance")]
    UnsupportedInstance {
        /// Backend being constructed.
        backend: Backend,
        /// Kind of instance that was supplied.
        instance: &'static str,
    },

    /// The selected backend was not compiled into this build.
    #[error("the {0} backend is not enabled in this build")]
    BackendDisabled(Backend),

    /// The JSON payload could not be serialized.
    #[error("failed to serialize JSON payload: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The response body is not valid JSON.
    #[error("failed to decode JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The token provider failed to produce a token.
    #[error("token provider failed: {0}")]
    Token(#[source] BoxError),

    /// Socket-level failure in the built-in transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The built-in transport gave up waiting for the server.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server sent something the built-in transport cannot parse.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Failure reported by `reqwest`.
    #[cfg(feature = "reqwest")]
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Failure reported by `reqwest-middleware`.
    #[cfg(feature = "middleware")]
    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
}

impl From<http::header::InvalidHeaderValue> for HttpError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for HttpError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// Errors that can occur while loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`ClientConfig`](crate::config::ClientConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
