#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP client layer for the SatelliteVu SDK.
//!
//! Issue requests through interchangeable transport backends behind one
//! interface, with bearer tokens injected automatically for URLs under a
//! registered prefix.
//!
//! ```no_run
//! use satvu_http::{ReqwestClient, Request, StaticToken};
//!
//! # async fn run() -> Result<(), satvu_http::HttpError> {
//! let client = ReqwestClient::new();
//! client.set_auth("https://api.example.com/", StaticToken::bearer("token"));
//!
//! let response = client
//!     .request(&Request::get("https://api.example.com/orders"))
//!     .await?;
//! let orders: serde_json::Value = response.json()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`auth`] — token providers and prefix-scoped bindings
//! - [`client`] — the shared request lifecycle and the [`HttpClient`] trait
//! - [`config`] — TOML configuration and runtime backend selection
//! - [`constants`] — content types, defaults, environment variable names
//! - [`error`] — error types
//! - [`payload`] — form / JSON body encoding
//! - [`request`] — the request descriptor
//! - [`response`] — the uniform response
//! - [`transport`] — backend transports
//!
//! # Feature Flags
//!
//! - `reqwest` — pooled `reqwest::Client` backend (default)
//! - `middleware` — `reqwest-middleware` backend (default)
//! - `telemetry` — tracing instrumentation

pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod payload;
pub mod request;
pub mod response;
pub mod transport;

pub use auth::{AuthBinding, AuthRegistry, CallbackTokenProvider, StaticToken, TokenProvider};
#[cfg(feature = "middleware")]
pub use client::MiddlewareClient;
#[cfg(feature = "reqwest")]
pub use client::ReqwestClient;
pub use client::{BuiltinClient, Client, HttpClient};
pub use config::{Backend, ClientConfig, Instance};
pub use error::{BoxError, ConfigError, HttpError};
pub use request::Request;
pub use response::Response;
pub use transport::{BuiltinTransport, Transport};
