//! HTTP-specific constants for the client layer.

/// Content type for form-encoded request bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Content type for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// User agent sent by the built-in transport and default-built backends.
pub const DEFAULT_USER_AGENT: &str = concat!("satvu-http/", env!("CARGO_PKG_VERSION"));

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SATVU_HTTP_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "satvu-http.toml";

/// Upper bound on the response head accepted by the built-in transport.
pub const MAX_RESPONSE_HEAD_BYTES: usize = 64 * 1024;
