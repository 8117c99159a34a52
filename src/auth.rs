//! OAuth2/OIDC token acquisition.
//!
//! Four grant strategies are supported; which one is used is decided by
//! [`Credentials::strategy`] from the values that were supplied.

use std::fmt;

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::ClientError;
use crate::session::ensure_trailing_slash;

const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// How an access token is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantStrategy {
    /// A token was supplied up front; no exchange happens.
    AccessToken,
    Password,
    RefreshToken,
    ClientCredentials,
}

impl GrantStrategy {
    /// Value of the `grant_type` form field, `None` for passthrough.
    pub fn grant_type(self) -> Option<&'static str> {
        match self {
            Self::AccessToken => None,
            Self::Password => Some("password"),
            Self::RefreshToken => Some("refresh_token"),
            Self::ClientCredentials => Some("client_credentials"),
        }
    }
}

impl fmt::Display for GrantStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AccessToken => "access_token",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        })
    }
}

/// Secrets a client may authenticate with.
///
/// Secret values are held as [`SecretString`], so `Debug` output redacts them.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub client_secret: Option<SecretString>,
}

impl Credentials {
    /// Selects the grant strategy; the first match wins:
    /// access token, then username and password, then refresh token, then
    /// client secret.
    pub fn strategy(&self) -> Option<GrantStrategy> {
        if self.access_token.is_some() {
            Some(GrantStrategy::AccessToken)
        } else if self.username.is_some() && self.password.is_some() {
            Some(GrantStrategy::Password)
        } else if self.refresh_token.is_some() {
            Some(GrantStrategy::RefreshToken)
        } else if self.client_secret.is_some() {
            Some(GrantStrategy::ClientCredentials)
        } else {
            None
        }
    }
}

/// Tokens produced by a successful grant.
#[derive(Clone, Debug)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl TokenSet {
    /// Tokens supplied up front, used as-is.
    pub fn passthrough(credentials: &Credentials) -> Result<Self, ClientError> {
        let access_token =
            credentials
                .access_token
                .clone()
                .ok_or(ClientError::MissingCredential {
                    strategy: GrantStrategy::AccessToken,
                    field: "access_token",
                })?;
        debug!("using supplied access token");
        Ok(Self {
            access_token,
            refresh_token: credentials.refresh_token.clone(),
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Subset of an OpenID Connect discovery document.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub issuer: Option<String>,
    pub token_endpoint: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
}

/// Fetches the discovery document published under `auth_url`.
pub fn discover(
    http: &reqwest::blocking::Client,
    auth_url: &str,
) -> Result<DiscoveryDocument, ClientError> {
    let base = Url::parse(auth_url).map_err(|_| ClientError::InvalidBaseUrl(auth_url.to_owned()))?;
    let url = ensure_trailing_slash(base)
        .join(DISCOVERY_PATH)
        .map_err(|_| ClientError::InvalidPath(DISCOVERY_PATH.to_owned()))?;

    debug!(%url, "fetching discovery document");
    let response = http.get(url.clone()).send()?;
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(ClientError::HttpStatus {
            status,
            url: url.to_string(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Exchanges credentials for tokens at one token endpoint.
#[derive(Clone, Debug)]
pub struct Authenticator {
    http: reqwest::blocking::Client,
    token_endpoint: Url,
    client_id: String,
    scope: Option<String>,
}

impl Authenticator {
    pub fn new(
        http: reqwest::blocking::Client,
        token_endpoint: &str,
        client_id: impl Into<String>,
        scope: Option<String>,
    ) -> Result<Self, ClientError> {
        let token_endpoint = Url::parse(token_endpoint)
            .map_err(|_| ClientError::InvalidBaseUrl(token_endpoint.to_owned()))?;
        Ok(Self {
            http,
            token_endpoint,
            client_id: client_id.into(),
            scope,
        })
    }

    /// Resolves the token endpoint through discovery under `auth_url`.
    pub fn discover(
        http: reqwest::blocking::Client,
        auth_url: &str,
        client_id: impl Into<String>,
        scope: Option<String>,
    ) -> Result<Self, ClientError> {
        let document = discover(&http, auth_url)?;
        Self::new(http, &document.token_endpoint, client_id, scope)
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Obtains tokens with the given strategy.
    ///
    /// [`GrantStrategy::AccessToken`] returns the supplied tokens without any
    /// network call. Any non-success status from the token endpoint is an
    /// [`ClientError::Authentication`]; nothing is retried here.
    pub fn authenticate(
        &self,
        strategy: GrantStrategy,
        credentials: &Credentials,
    ) -> Result<TokenSet, ClientError> {
        if strategy == GrantStrategy::AccessToken {
            return TokenSet::passthrough(credentials);
        }

        let form = self.grant_form(strategy, credentials)?;
        debug!(grant = %strategy, endpoint = %self.token_endpoint, "requesting token");
        let response = self
            .http
            .post(self.token_endpoint.clone())
            .form(&form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ClientError::Authentication {
                status: Some(status),
                message: body,
            });
        }

        let tokens: TokenResponse = serde_json::from_str(&body)?;
        info!(grant = %strategy, refresh_token = tokens.refresh_token.is_some(), "obtained access token");
        Ok(TokenSet {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: tokens.refresh_token.map(SecretString::from),
        })
    }

    /// Form fields for a token request; the only place secrets are exposed.
    pub(crate) fn grant_form<'a>(
        &'a self,
        strategy: GrantStrategy,
        credentials: &'a Credentials,
    ) -> Result<Vec<(&'static str, &'a str)>, ClientError> {
        let missing = |field| ClientError::MissingCredential { strategy, field };
        let secret = |value: Option<&'a SecretString>, field| {
            value.map(ExposeSecret::expose_secret).ok_or_else(|| missing(field))
        };

        let grant_type = strategy.grant_type().ok_or_else(|| missing("grant_type"))?;
        let mut form = vec![("grant_type", grant_type), ("client_id", self.client_id.as_str())];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        match strategy {
            GrantStrategy::AccessToken => {}
            GrantStrategy::Password => {
                let username = credentials.username.as_deref().ok_or_else(|| missing("username"))?;
                form.push(("username", username));
                form.push(("password", secret(credentials.password.as_ref(), "password")?));
            }
            GrantStrategy::RefreshToken => {
                form.push((
                    "refresh_token",
                    secret(credentials.refresh_token.as_ref(), "refresh_token")?,
                ));
            }
            GrantStrategy::ClientCredentials => {
                form.push((
                    "client_secret",
                    secret(credentials.client_secret.as_ref(), "client_secret")?,
                ));
            }
        }
        Ok(form)
    }
}
