//! Client configuration and runtime backend selection.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! backend = "reqwest"
//! timeout_ms = 30000
//! user_agent = "my-app/1.0"
//!
//! [[auth]]
//! prefix = "https://api.example.com/"
//! token = "Bearer $API_TOKEN"
//! ```
//!
//! # Environment Variables
//!
//! - `SATVU_HTTP_CONFIG` — Path to configuration file (default: `satvu-http.toml`)
//! - Tokens and other values referenced by `$VAR` in the config file

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::StaticToken;
use crate::client::{BuiltinClient, Client, HttpClient};
use crate::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use crate::error::{ConfigError, HttpError};
use crate::transport::BuiltinTransport;

/// Available transport backends.
///
/// Every variant always exists; building one whose cargo feature is off
/// fails with [`HttpError::BackendDisabled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// HTTP/1.1 over a plain TCP socket.
    Builtin,
    /// Pooled `reqwest::Client` session (feature: `reqwest`).
    #[default]
    Reqwest,
    /// `reqwest-middleware` client stack (feature: `middleware`).
    Middleware,
}

impl Backend {
    /// All backends, in declaration order.
    pub const ALL: [Self; 3] = [Self::Builtin, Self::Reqwest, Self::Middleware];

    /// Lowercase name, as used in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Reqwest => "reqwest",
            Self::Middleware => "middleware",
        }
    }

    /// Whether this backend was compiled into the current build.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        match self {
            Self::Builtin => true,
            Self::Reqwest => cfg!(feature = "reqwest"),
            Self::Middleware => cfg!(feature = "middleware"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown backend `{s}` (expected builtin, reqwest or middleware)"))
    }
}

/// A pre-built transport handed to [`ClientConfig::build_with`].
#[derive(Debug)]
pub enum Instance {
    /// A configured `reqwest::Client`.
    #[cfg(feature = "reqwest")]
    Reqwest(reqwest::Client),
    /// A configured middleware stack.
    #[cfg(feature = "middleware")]
    Middleware(reqwest_middleware::ClientWithMiddleware),
}

impl Instance {
    /// Short name of the instance kind, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match *self {
            #[cfg(feature = "reqwest")]
            Self::Reqwest(_) => "reqwest::Client",
            #[cfg(feature = "middleware")]
            Self::Middleware(_) => "ClientWithMiddleware",
        }
    }
}

/// One `[[auth]]` entry: a URL prefix and the token sent under it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// URL prefix the token applies to.
    pub prefix: String,
    /// Value of the `Authorization` header. Supports `$VAR` / `${VAR}`.
    pub token: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend to build (default: `reqwest`).
    #[serde(default)]
    pub backend: Backend,

    /// Request timeout in milliseconds, applied by the backend itself.
    /// `0` means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// `User-Agent` for default-built backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Static tokens registered in file order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth: Vec<AuthConfig>,
}

impl ClientConfig {
    /// Creates a config for `backend` with everything else defaulted.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Sets the timeout, rounded up to whole milliseconds.
    ///
    /// [`Duration::ZERO`] clears it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Adds a static token for `prefix`.
    #[must_use]
    pub fn with_auth(mut self, prefix: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth.push(AuthConfig {
            prefix: prefix.into(),
            token: token.into(),
        });
        self
    }

    /// Loads configuration from the path given by `SATVU_HTTP_CONFIG`,
    /// falling back to `satvu-http.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text, expanding `$VAR` references
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    /// Builds a client for the configured backend.
    ///
    /// # Errors
    ///
    /// See [`build_with`](Self::build_with).
    pub fn build(&self) -> Result<Box<dyn HttpClient>, HttpError> {
        self.build_with(None)
    }

    /// Builds a client, optionally around a pre-built transport instance.
    ///
    /// Every `[[auth]]` entry is registered on the new client.
    ///
    /// # Errors
    ///
    /// - [`HttpError::UnsupportedInstance`] if an instance is given to the
    ///   built-in backend or does not match the configured backend
    /// - [`HttpError::BackendDisabled`] if the backend was not compiled in
    /// - [`HttpError::Reqwest`] if a default `reqwest::Client` cannot be built
    pub fn build_with(&self, instance: Option<Instance>) -> Result<Box<dyn HttpClient>, HttpError> {
        let client = match (self.backend, instance) {
            (Backend::Builtin, Some(instance)) => {
                return Err(HttpError::UnsupportedInstance {
                    backend: Backend::Builtin,
                    instance: instance.kind(),
                });
            }
            (Backend::Builtin, None) => self.builtin(),
            #[cfg(feature = "reqwest")]
            (Backend::Reqwest, instance) => self.reqwest_client(instance)?,
            #[cfg(feature = "middleware")]
            (Backend::Middleware, instance) => self.middleware_client(instance)?,
            #[allow(unreachable_patterns)]
            (backend, _) => return Err(HttpError::BackendDisabled(backend)),
        };

        for entry in &self.auth {
            client.set_auth(entry.prefix.clone(), Arc::new(StaticToken::new(&entry.token)));
        }
        Ok(client)
    }

    fn builtin(&self) -> Box<dyn HttpClient> {
        let mut transport = BuiltinTransport::new();
        if let Some(timeout) = self.timeout() {
            transport = transport.with_timeout(timeout);
        }
        if let Some(agent) = &self.user_agent {
            transport = transport.with_user_agent(agent.clone());
        }
        let client: BuiltinClient = Client::with_transport(transport);
        Box::new(client)
    }

    #[cfg(feature = "reqwest")]
    fn reqwest_session(&self) -> Result<reqwest::Client, HttpError> {
        let mut builder = reqwest::Client::builder().user_agent(
            self.user_agent
                .as_deref()
                .unwrap_or(crate::constants::DEFAULT_USER_AGENT),
        );
        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    #[cfg(feature = "reqwest")]
    fn reqwest_client(&self, instance: Option<Instance>) -> Result<Box<dyn HttpClient>, HttpError> {
        let session = match instance {
            None => self.reqwest_session()?,
            Some(Instance::Reqwest(session)) => session,
            #[allow(unreachable_patterns)]
            Some(other) => {
                return Err(HttpError::UnsupportedInstance {
                    backend: Backend::Reqwest,
                    instance: other.kind(),
                });
            }
        };
        Ok(Box::new(crate::client::ReqwestClient::with_instance(session)))
    }

    #[cfg(feature = "middleware")]
    fn middleware_client(&self, instance: Option<Instance>) -> Result<Box<dyn HttpClient>, HttpError> {
        let stack = match instance {
            None => reqwest_middleware::ClientBuilder::new(self.reqwest_session()?).build(),
            Some(Instance::Middleware(stack)) => stack,
            Some(other) => {
                return Err(HttpError::UnsupportedInstance {
                    backend: Backend::Middleware,
                    instance: other.kind(),
                });
            }
        };
        Ok(Box::new(crate::client::MiddlewareClient::with_instance(stack)))
    }
}

/// Expands `$VAR` and `${VAR}` patterns using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name) {
            Some(value) if !name.is_empty() && (closed || !braced) => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
