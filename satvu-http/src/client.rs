//! The uniform client and its object-safe contract.
//!
//! [`Client`] runs the request lifecycle shared by every backend:
//!
//! 1. find the [`AuthBinding`](crate::auth::AuthBinding) whose prefix matches
//!    the URL and, unless the caller set `Authorization`, inject its token
//! 2. encode form fields or JSON into the body and set `Content-Type`
//! 3. hand the prepared request to the [`Transport`]
//!
//! [`HttpClient`] is the same surface as a trait object, for code that picks
//! the backend at runtime (see [`ClientConfig::build`](crate::config::ClientConfig::build)).

use std::fmt;
use std::sync::Arc;

use http::HeaderValue;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument, trace};
use url::Url;

use crate::auth::{AuthBinding, AuthRegistry, TokenProvider};
use crate::config::Backend;
use crate::error::HttpError;
use crate::payload;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{BoxFuture, BuiltinTransport, PreparedRequest, Transport};

/// Object-safe client contract implemented by every [`Client`].
pub trait HttpClient: Send + Sync + fmt::Debug {
    /// Which backend serves this client.
    fn backend(&self) -> Backend;

    /// Resolves auth and payload, sends the request and returns the response.
    fn request<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, HttpError>>;

    /// Registers `provider` for every URL starting with `prefix`.
    fn set_auth(&self, prefix: String, provider: Arc<dyn TokenProvider>);

    /// Number of registered auth bindings.
    fn auth_bindings(&self) -> usize;
}

/// A client over transport `T` with its own auth bindings.
///
/// Bindings registered on one client never affect another.
pub struct Client<T> {
    transport: T,
    auth: AuthRegistry,
}

/// Client over the built-in TCP transport.
pub type BuiltinClient = Client<BuiltinTransport>;

/// Client over a pooled [`reqwest::Client`] session.
#[cfg(feature = "reqwest")]
pub type ReqwestClient = Client<reqwest::Client>;

/// Client over a [`reqwest_middleware::ClientWithMiddleware`] stack.
#[cfg(feature = "middleware")]
pub type MiddlewareClient = Client<reqwest_middleware::ClientWithMiddleware>;

impl<T: Transport> Client<T> {
    /// Wraps an existing transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            auth: AuthRegistry::new(),
        }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers `provider` for every URL starting with `prefix`.
    ///
    /// Bindings accumulate. When several prefixes match a URL the longest
    /// one is used; equal lengths resolve to the latest registration.
    pub fn set_auth(&self, prefix: impl Into<String>, provider: impl TokenProvider + 'static) {
        self.auth
            .register(AuthBinding::new(prefix, Arc::new(provider)));
    }

    /// Sends `request` through the transport.
    ///
    /// The caller's request is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Url`] for an unparsable URL,
    /// [`HttpError::Token`] if the matching provider fails,
    /// [`HttpError::Serialize`] for an unserializable JSON payload, and
    /// whatever the transport reports for network failures.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "satvu_http.request",
            skip_all,
            fields(method = %request.method(), url = %request.url(), backend = %self.transport.backend()),
            err
        )
    )]
    pub async fn request(&self, request: &Request) -> Result<Response, HttpError> {
        let prepared = self.prepare(request).await?;
        let response = self.transport.send(prepared).await?;

        #[cfg(feature = "telemetry")]
        trace!(status = %response.status(), "Received response");

        Ok(response)
    }

    /// Applies auth and payload rules, producing what goes on the wire.
    async fn prepare(&self, request: &Request) -> Result<PreparedRequest, HttpError> {
        let url = Url::parse(request.url())?;
        let mut headers = request.header_map().clone();

        if !headers.contains_key(AUTHORIZATION)
            && let Some(binding) = self.auth.resolve(request.url())
        {
            #[cfg(feature = "telemetry")]
            debug!(prefix = binding.prefix(), "Injecting Authorization header");

            let token = binding.provider().token().await.map_err(HttpError::Token)?;
            let mut value = HeaderValue::from_str(&token)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let body = match payload::encode(request.data(), request.json_value())? {
            Some(payload) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(payload.content_type));
                }
                Some(payload.body)
            }
            None => None,
        };

        Ok(PreparedRequest {
            method: request.method().clone(),
            url,
            headers,
            body,
        })
    }
}

impl<T: Transport> HttpClient for Client<T> {
    fn backend(&self) -> Backend {
        self.transport.backend()
    }

    fn request<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, HttpError>> {
        Box::pin(Self::request(self, request))
    }

    fn set_auth(&self, prefix: String, provider: Arc<dyn TokenProvider>) {
        self.auth.register(AuthBinding::new(prefix, provider));
    }

    fn auth_bindings(&self) -> usize {
        self.auth.len()
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.transport.backend())
            .field("auth_bindings", &self.auth.len())
            .finish_non_exhaustive()
    }
}

impl BuiltinClient {
    /// Creates a client over a default [`BuiltinTransport`].
    ///
    /// There is no instance-injecting constructor: the built-in transport
    /// has no session to share.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(BuiltinTransport::new())
    }
}

impl Default for BuiltinClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "reqwest")]
impl ReqwestClient {
    /// Creates a client that owns a default [`reqwest::Client`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(reqwest::Client::new())
    }

    /// Creates a client over a caller-configured [`reqwest::Client`]
    /// (proxies, pool sizes, TLS roots, default headers).
    #[must_use]
    pub fn with_instance(instance: reqwest::Client) -> Self {
        Self::with_transport(instance)
    }
}

#[cfg(feature = "reqwest")]
impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "middleware")]
impl MiddlewareClient {
    /// Creates a client over a middleware stack with no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(
            reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build(),
        )
    }

    /// Creates a client over a caller-built middleware stack.
    #[must_use]
    pub fn with_instance(instance: reqwest_middleware::ClientWithMiddleware) -> Self {
        Self::with_transport(instance)
    }
}

#[cfg(feature = "middleware")]
impl Default for MiddlewareClient {
    fn default() -> Self {
        Self::new()
    }
}
