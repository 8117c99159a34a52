use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Method;
use serde_json::{Value, json};
use suite_client::{Client, ClientConfig, RequestSpec, into_json};
use tracing_subscriber::EnvFilter;

/// Settings come from the `SUITE_*` environment variables. Flags override
/// the non-secret ones; credentials are only read from the environment.
#[derive(Debug, Parser)]
#[command(
    name = "suite-cli",
    version,
    about = "Authenticated CLI for the suite REST services"
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Default, Args)]
struct Overrides {
    /// Base URL of the API service [SUITE_BASE_URL].
    #[arg(long)]
    base_url: Option<String>,

    /// Authorization server URL used for discovery [SUITE_AUTH_URL].
    #[arg(long)]
    auth_url: Option<String>,

    /// Token endpoint, skipping discovery [SUITE_TOKEN_URL].
    #[arg(long)]
    token_url: Option<String>,

    /// [SUITE_CLIENT_ID]
    #[arg(long)]
    client_id: Option<String>,

    /// [SUITE_SCOPE]
    #[arg(long)]
    scope: Option<String>,

    /// Account for the password grant; the password comes from SUITE_PASSWORD.
    #[arg(long)]
    username: Option<String>,

    /// Per-request timeout in seconds [SUITE_TIMEOUT_SECS].
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Retries for transient failures [SUITE_MAX_RETRIES].
    #[arg(long)]
    max_retries: Option<u32>,
}

impl Overrides {
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "SUITE_BASE_URL" => self.base_url.clone(),
            "SUITE_AUTH_URL" => self.auth_url.clone(),
            "SUITE_TOKEN_URL" => self.token_url.clone(),
            "SUITE_CLIENT_ID" => self.client_id.clone(),
            "SUITE_SCOPE" => self.scope.clone(),
            "SUITE_USERNAME" => self.username.clone(),
            "SUITE_TIMEOUT_SECS" => self.timeout_secs.map(|secs| secs.to_string()),
            "SUITE_MAX_RETRIES" => self.max_retries.map(|retries| retries.to_string()),
            _ => None,
        }
    }

    /// Flag values win over `env`.
    fn client_config(&self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        ClientConfig::from_lookup(|key| self.lookup(key).or_else(|| env(key)))
            .context("invalid client configuration")
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authenticate and print the selected grant.
    Token,
    /// Send an authenticated HTTP request using method + path.
    Request(RequestArgs),
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...).
    #[arg(value_parser = parse_method)]
    method: Method,

    /// Request path relative to the base URL (for example: jobs/17).
    path: String,

    /// Query parameter in form key=value. Repeat as needed.
    #[arg(long = "query", value_name = "KEY=VALUE", value_parser = parse_pair)]
    query: Vec<(String, String)>,

    #[command(flatten)]
    body: BodyInput,
}

#[derive(Debug, Args)]
#[group(multiple = false)]
struct BodyInput {
    /// JSON request body literal.
    #[arg(long, value_parser = parse_json)]
    body_json: Option<Value>,

    /// Path to a file containing a JSON request body.
    #[arg(long, value_name = "PATH")]
    body_file: Option<PathBuf>,
}

impl RequestArgs {
    fn to_request(&self) -> Result<RequestSpec> {
        let mut request = RequestSpec::new(self.method.clone(), &self.path);
        request.query.clone_from(&self.query);
        request.body = match (&self.body.body_json, &self.body.body_file) {
            (Some(body), _) => Some(body.clone()),
            (None, Some(path)) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read --body-file '{}'", path.display()))?;
                let body = parse_json(&raw)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("invalid JSON in --body-file '{}'", path.display()))?;
                Some(body)
            }
            (None, None) => None,
        };
        Ok(request)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.overrides.client_config(|key| std::env::var(key).ok())?;
    let base_url = config.base_url.clone();
    let client = Client::new(config).with_context(|| format!("failed to create client for '{base_url}'"))?;

    let output = match &cli.command {
        Command::Token => token_summary(&client),
        Command::Request(args) => {
            let request = args.to_request()?;
            client
                .execute(&request)
                .and_then(into_json)
                .with_context(|| format!("request failed: {} {}", request.method, request.path))?
        }
    };

    let rendered = if cli.compact {
        serde_json::to_string(&output)
    } else {
        serde_json::to_string_pretty(&output)
    };
    println!("{}", rendered.context("failed to render JSON")?);
    Ok(())
}

/// Grant in use and whether a refresh token is held; token values stay hidden.
fn token_summary(client: &Client) -> Value {
    json!({
        "strategy": client.strategy().to_string(),
        "refresh_token": client.refresh_token().is_some(),
    })
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_str(&raw.to_ascii_uppercase()).map_err(|_| format!("invalid HTTP method '{raw}'"))
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some(("", _)) => Err(format!("'{raw}' has an empty key")),
        Some((key, value)) => Ok((key.to_owned(), value.to_owned())),
        None => Err(format!("'{raw}' is not key=value")),
    }
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|error| error.to_string())
}
