//! Issue a single request through a `satvu-http` backend.
//!
//! # Usage
//!
//! ```bash
//! # GET with the default backend
//! satvu-request https://api.example.com/orders
//!
//! # Form POST through the built-in backend
//! satvu-request --backend builtin -X POST -d foo=bar http://localhost:8080/
//!
//! # Scoped token
//! SATVU_TOKEN="Bearer abc" satvu-request --auth-prefix https://api.example.com/ \
//!     https://api.example.com/orders
//! ```
//!
//! # Environment Variables
//!
//! - `SATVU_HTTP_CONFIG` — Path to TOML configuration file (default: `satvu-http.toml`)
//! - `SATVU_TOKEN` — Token registered under `--auth-prefix`
//! - `RUST_LOG` — Log level filter (default: `info`)

use std::io::Write;

use clap::Parser;
use http::Method;
use satvu_http::{Backend, ClientConfig, Request};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "satvu-request", version, about)]
struct Args {
    /// Configuration file.
    #[arg(long, env = "SATVU_HTTP_CONFIG")]
    config: Option<String>,

    /// Backend override: builtin, reqwest or middleware.
    #[arg(long)]
    backend: Option<Backend>,

    /// Request method.
    #[arg(short = 'X', long = "method", default_value = "GET", value_parser = parse_method)]
    method: Method,

    /// Extra header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Form field, `key=value`. Repeatable. Takes precedence over `--json`.
    #[arg(short = 'd', long = "data", value_parser = parse_field)]
    data: Vec<(String, String)>,

    /// JSON body.
    #[arg(long, value_parser = parse_json)]
    json: Option<serde_json::Value>,

    /// `Authorization` value sent for URLs under `--auth-prefix`.
    #[arg(long, env = "SATVU_TOKEN", hide_env_values = true, requires = "auth_prefix")]
    token: Option<String>,

    /// URL prefix the token applies to.
    #[arg(long)]
    auth_prefix: Option<String>,

    /// Target URL.
    url: String,
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{s}`"))?;
    Ok((name.trim().to_owned(), value.trim().to_owned()))
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `key=value`, got `{s}`"))?;
    Ok((key.to_owned(), value.to_owned()))
}

fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("Request failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let (Some(token), Some(prefix)) = (args.token, args.auth_prefix) {
        config = config.with_auth(prefix, token);
    }
    tracing::info!(
        backend = %config.backend,
        auth = config.auth.len(),
        "Loaded configuration"
    );

    let client = config.build()?;

    let mut request = Request::new(args.method, args.url);
    for (name, value) in &args.headers {
        request = request.try_header(name, value)?;
    }
    if !args.data.is_empty() {
        request = request.form(args.data);
    }
    if let Some(json) = args.json {
        request = request.json(json);
    }

    let response = client.request(&request).await?;
    tracing::info!(status = %response.status(), bytes = response.bytes().len(), "Received response");

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", response.status())?;
    stdout.write_all(response.bytes())?;
    if !response.bytes().ends_with(b"\n") {
        writeln!(stdout)?;
    }
    Ok(())
}
