//! Transport over a [`reqwest_middleware::ClientWithMiddleware`] stack.
//!
//! This is a decorator over `reqwest`, not a separate HTTP engine: requests
//! pass through the caller's middleware (tracing, caching, signing) and are
//! then sent by the wrapped `reqwest::Client`, with the same connection pool
//! and protocol support as the `reqwest` backend.

use reqwest_middleware::ClientWithMiddleware;

use super::session::wrap;
use super::{BoxFuture, PreparedRequest, Transport};
use crate::config::Backend;
use crate::error::HttpError;
use crate::response::Response;

impl Transport for ClientWithMiddleware {
    fn backend(&self) -> Backend {
        Backend::Middleware
    }

    fn send(&self, request: PreparedRequest) -> BoxFuture<'_, Result<Response, HttpError>> {
        Box::pin(async move {
            let mut builder = self
                .request(request.method, request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }
            let response = builder.send().await?;
            wrap(response).await
        })
    }
}
