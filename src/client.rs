use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::blocking::Response;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::session::into_json;
use crate::{
    Authenticator, ClientConfig, ClientError, Credentials, GrantStrategy, RequestSpec, Schema,
    Session, TokenSet,
};

/// Re-authentications allowed per logical request.
const REAUTH_RETRIES: u32 = 1;

#[derive(Debug)]
struct CredentialState {
    strategy: GrantStrategy,
    credentials: Credentials,
    tokens: TokenSet,
    authenticator: Option<Authenticator>,
}

/// Authenticated API client.
///
/// Owns the access/refresh token pair for its lifetime and installs the
/// access token as the session's `Authorization` header. A request answered
/// with 401 triggers one token refresh and one replay; a second 401 is
/// returned to the caller.
///
/// The credential state sits behind a mutex only for memory safety: the lock
/// is never held across network calls, so threads sharing one client that
/// see concurrent 401s may each refresh the token. Use one client per thread
/// or synchronize externally when that matters.
#[derive(Debug)]
pub struct Client {
    session: Session,
    http: reqwest::blocking::Client,
    auth: AuthConfig,
    state: Mutex<CredentialState>,
}

impl Client {
    /// Builds the HTTP session and authenticates.
    ///
    /// A supplied access token is used directly without contacting the token
    /// endpoint; otherwise the selected grant is exchanged before returning.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let session = Session::new(&config.base_url, http.clone(), config.retry.clone())?;

        let credentials = config.auth.credentials.clone();
        let strategy = credentials
            .strategy()
            .ok_or(ClientError::MissingCredentials)?;

        let client = Self {
            session,
            http,
            auth: config.auth,
            state: Mutex::new(CredentialState {
                strategy,
                credentials,
                tokens: TokenSet {
                    access_token: SecretString::from(String::new()),
                    refresh_token: None,
                },
                authenticator: None,
            }),
        };
        client.authenticate()?;
        Ok(client)
    }

    /// Underlying session; requests sent through it bypass the 401 retry.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Strategy selected from the configured credentials.
    pub fn strategy(&self) -> GrantStrategy {
        self.lock_state().strategy
    }

    /// Current access token.
    pub fn access_token(&self) -> SecretString {
        self.lock_state().tokens.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<SecretString> {
        self.lock_state().tokens.refresh_token.clone()
    }

    /// Obtains a new access token and installs it on the session.
    ///
    /// Client-credentials clients repeat the client-credentials exchange;
    /// every other strategy uses the refresh-token grant with the current
    /// refresh token.
    pub fn refresh_access_token(&self) -> Result<(), ClientError> {
        let (strategy, credentials) = {
            let state = self.lock_state();
            match state.strategy {
                GrantStrategy::ClientCredentials => {
                    (GrantStrategy::ClientCredentials, state.credentials.clone())
                }
                GrantStrategy::AccessToken | GrantStrategy::Password | GrantStrategy::RefreshToken => (
                    GrantStrategy::RefreshToken,
                    Credentials {
                        refresh_token: state.tokens.refresh_token.clone(),
                        ..Credentials::default()
                    },
                ),
            }
        };

        if strategy == GrantStrategy::RefreshToken && credentials.refresh_token.is_none() {
            return Err(ClientError::MissingCredential {
                strategy,
                field: "refresh_token",
            });
        }

        let tokens = self.authenticator()?.authenticate(strategy, &credentials)?;
        self.install(tokens)?;
        info!(grant = %strategy, "access token refreshed");
        Ok(())
    }

    /// Sends a request, refreshing the token and replaying once on 401.
    ///
    /// The response is returned whatever its status; use the JSON helpers to
    /// turn error statuses into [`ClientError::HttpStatus`].
    pub fn execute(&self, request: &RequestSpec) -> Result<Response, ClientError> {
        let mut reauth_budget = REAUTH_RETRIES;
        loop {
            let response = self.session.send(request)?;
            if response.status() != StatusCode::UNAUTHORIZED || reauth_budget == 0 {
                return Ok(response);
            }
            drop(response);

            reauth_budget -= 1;
            warn!(method = %request.method, path = %request.path, "request unauthorized, re-authenticating");
            self.refresh_access_token()?;
        }
    }

    /// Sends a `GET` request and parses the response as JSON.
    pub fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        self.request_json(Method::GET, path, None)
    }

    /// Sends a `GET` request with query parameters and parses the response as JSON.
    pub fn get_json_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.request_json_with_query(Method::GET, path, query, None)
    }

    /// Sends a `POST` request with a JSON body and parses the response as JSON.
    pub fn post_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.request_json(Method::POST, path, Some(body))
    }

    /// Sends a `PUT` request with a JSON body and parses the response as JSON.
    pub fn put_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.request_json(Method::PUT, path, Some(body))
    }

    /// Sends a `PATCH` request with a JSON body and parses the response as JSON.
    pub fn patch_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.request_json(Method::PATCH, path, Some(body))
    }

    /// Sends a `DELETE` request and parses the response as JSON.
    pub fn delete_json(&self, path: &str) -> Result<Value, ClientError> {
        self.request_json(Method::DELETE, path, None)
    }

    /// Sends a request and parses the response as JSON.
    ///
    /// Use [`Self::request_json_with_query`] when query parameters are needed.
    pub fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        self.request_json_with_query(method, path, &[], body)
    }

    /// Sends a request with query parameters and parses the response as JSON.
    ///
    /// Returns [`Value::Null`] for successful responses with an empty body.
    pub fn request_json_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let mut request = RequestSpec::new(method, path).with_query(query);
        request.body = body;
        into_json(self.execute(&request)?)
    }

    /// Fetches one resource.
    pub fn get_resource<S: Schema>(&self, path: &str) -> Result<S, ClientError> {
        let payload = self.get_json(path)?;
        Ok(S::load(&payload)?)
    }

    /// Fetches a JSON array of resources, in server order.
    pub fn list_resources<S: Schema>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<S>, ClientError> {
        let payload = self.get_json_with_query(path, query)?;
        Ok(S::load_many(&payload)?)
    }

    /// Creates a resource with `POST` and loads the server's representation.
    pub fn create_resource<S: Schema>(&self, path: &str, resource: &S) -> Result<S, ClientError> {
        let payload = self.post_json(path, Value::Object(resource.dump()?))?;
        Ok(S::load(&payload)?)
    }

    /// Replaces a resource with `PUT` and loads the server's representation.
    pub fn update_resource<S: Schema>(&self, path: &str, resource: &S) -> Result<S, ClientError> {
        let payload = self.put_json(path, Value::Object(resource.dump()?))?;
        Ok(S::load(&payload)?)
    }

    /// Deletes a resource, discarding any response body.
    pub fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.delete_json(path).map(drop)
    }

    fn authenticate(&self) -> Result<(), ClientError> {
        let (strategy, credentials) = {
            let state = self.lock_state();
            (state.strategy, state.credentials.clone())
        };

        let mut tokens = match strategy {
            GrantStrategy::AccessToken => TokenSet::passthrough(&credentials)?,
            _ => self.authenticator()?.authenticate(strategy, &credentials)?,
        };
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = credentials.refresh_token;
        }
        self.install(tokens)
    }

    /// Rotates the tokens in place and updates the shared session header.
    fn install(&self, tokens: TokenSet) -> Result<(), ClientError> {
        self.session.set_bearer_token(tokens.access_token.expose_secret())?;
        let mut state = self.lock_state();
        state.tokens.access_token = tokens.access_token;
        if tokens.refresh_token.is_some() {
            state.tokens.refresh_token = tokens.refresh_token;
        }
        Ok(())
    }

    /// Token-endpoint client, resolved on first use.
    ///
    /// Discovery runs lazily so that access-token passthrough never touches
    /// the network.
    fn authenticator(&self) -> Result<Authenticator, ClientError> {
        if let Some(authenticator) = &self.lock_state().authenticator {
            return Ok(authenticator.clone());
        }

        let authenticator = match (&self.auth.token_endpoint, &self.auth.auth_url) {
            (Some(token_endpoint), _) => Authenticator::new(
                self.http.clone(),
                token_endpoint,
                self.auth.client_id.clone(),
                self.auth.scope.clone(),
            )?,
            (None, Some(auth_url)) => Authenticator::discover(
                self.http.clone(),
                auth_url,
                self.auth.client_id.clone(),
                self.auth.scope.clone(),
            )?,
            (None, None) => return Err(ClientError::MissingTokenEndpoint),
        };
        self.lock_state().authenticator = Some(authenticator.clone());
        Ok(authenticator)
    }

    fn lock_state(&self) -> MutexGuard<'_, CredentialState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
