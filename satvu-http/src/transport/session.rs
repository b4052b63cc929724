//! Pooled-session transport over [`reqwest::Client`].

use http::StatusCode;

use super::{BoxFuture, PreparedRequest, Transport};
use crate::config::Backend;
use crate::error::HttpError;
use crate::response::Response;

impl Transport for reqwest::Client {
    fn backend(&self) -> Backend {
        Backend::Reqwest
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

/// Copies status and headers, then buffers the body.
pub(super) async fn wrap(response: reqwest::Response) -> Result<Response, HttpError> {
    let status: StatusCode = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Ok(Response::new(status, headers, body))
}
