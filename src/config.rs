use std::time::Duration;

use secrecy::SecretString;

use crate::{ClientError, Credentials, RetryConfig};

const DEFAULT_CLIENT_ID: &str = "suite-client";
const DEFAULT_SCOPE: &str = "openid";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to obtain tokens.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Authorization base URL; the token endpoint is found through discovery.
    pub auth_url: Option<String>,
    /// Explicit token endpoint, used instead of discovery when set.
    pub token_endpoint: Option<String>,
    pub client_id: String,
    pub scope: Option<String>,
    pub credentials: Credentials,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_url: None,
            token_endpoint: None,
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            scope: Some(DEFAULT_SCOPE.to_owned()),
            credentials: Credentials::default(),
        }
    }
}

/// Settings for [`crate::Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth: AuthConfig,
    /// Upper bound on every HTTP round trip.
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    /// Reads configuration from `SUITE_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, keyed by `SUITE_*` variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = get("SUITE_BASE_URL").ok_or(ClientError::Config {
            key: "SUITE_BASE_URL",
            reason: "not set".to_owned(),
        })?;
        let mut config = Self::new(base_url);

        config.auth.auth_url = get("SUITE_AUTH_URL");
        config.auth.token_endpoint = get("SUITE_TOKEN_URL");
        if let Some(client_id) = get("SUITE_CLIENT_ID") {
            config.auth.client_id = client_id;
        }
        if let Some(scope) = get("SUITE_SCOPE") {
            config.auth.scope = Some(scope);
        }
        let get_secret = |key: &str| get(key).map(SecretString::from);
        config.auth.credentials = Credentials {
            access_token: get_secret("SUITE_ACCESS_TOKEN"),
            refresh_token: get_secret("SUITE_REFRESH_TOKEN"),
            username: get("SUITE_USERNAME"),
            password: get_secret("SUITE_PASSWORD"),
            client_secret: get_secret("SUITE_CLIENT_SECRET"),
        };

        if let Some(raw) = get("SUITE_TIMEOUT_SECS") {
            let seconds = raw.trim().parse::<u64>().map_err(|error| ClientError::Config {
                key: "SUITE_TIMEOUT_SECS",
                reason: error.to_string(),
            })?;
            config.timeout = Duration::from_secs(seconds);
        }
        if let Some(raw) = get("SUITE_MAX_RETRIES") {
            config.retry.max_retries = raw.trim().parse().map_err(|error: std::num::ParseIntError| {
                ClientError::Config {
                    key: "SUITE_MAX_RETRIES",
                    reason: error.to_string(),
                }
            })?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.auth.credentials.access_token = Some(secret(token));
        self
    }

    #[must_use]
    pub fn with_password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth.credentials.username = Some(username.into());
        self.auth.credentials.password = Some(secret(password));
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.auth.credentials.refresh_token = Some(secret(token));
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.auth.credentials.client_secret = Some(secret(client_secret));
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.auth.client_id = client_id.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.auth.scope = scope;
        self
    }

    #[must_use]
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth.auth_url = Some(auth_url.into());
        self
    }

    #[must_use]
    pub fn with_token_endpoint(mut self, token_endpoint: impl Into<String>) -> Self {
        self.auth.token_endpoint = Some(token_endpoint.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn secret(value: impl Into<String>) -> SecretString {
    let value: String = value.into();
    SecretString::from(value)
}
