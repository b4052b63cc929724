//! Backend transports.
//!
//! A [`Transport`] receives a fully resolved [`PreparedRequest`] (auth and
//! body already applied) and turns it into a uniform [`Response`]. Only the
//! native call and response wrapping differ between backends:
//!
//! - [`BuiltinTransport`] — HTTP/1.1 over a plain TCP socket, always compiled
//! - `reqwest::Client` — pooled session (feature: `reqwest`)
//! - `reqwest_middleware::ClientWithMiddleware` — middleware decorator over
//!   `reqwest` (feature: `middleware`)

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

use crate::config::Backend;
use crate::error::HttpError;
use crate::response::Response;

mod builtin;
#[cfg(feature = "middleware")]
mod middleware;
#[cfg(feature = "reqwest")]
mod session;

pub use builtin::BuiltinTransport;

/// Boxed future returned by the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: Method,
    /// Parsed target URL.
    pub url: Url,
    /// Outgoing headers, including any injected `Authorization` and `Content-Type`.
    pub headers: HeaderMap,
    /// Encoded body, if any.
    pub body: Option<Bytes>,
}

/// A backend able to dispatch a [`PreparedRequest`].
pub trait Transport: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> Backend;

    /// Sends the request and wraps the native response.
    ///
    /// Failures are the backend's own and are returned unchanged.
    fn send(&self, request: PreparedRequest) -> BoxFuture<'_, Result<Response, HttpError>>;
}
