use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

use reqwest::blocking::Response;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ClientError, RetryConfig};

/// Default headers shared between a [`Session`] and whoever rotates its token.
pub type SharedHeaders = Arc<RwLock<HeaderMap>>;

/// One HTTP request, kept as data so it can be rebuilt and replayed.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Appends query parameters.
    #[must_use]
    pub fn with_query(mut self, query: &[(&str, &str)]) -> Self {
        self.query.extend(
            query
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned())),
        );
        self
    }

    /// Sets a JSON request body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Blocking HTTP session bound to one API base URL.
///
/// Every request carries the shared default headers, including the current
/// `Authorization` value, and is retried on transient failures according to
/// the session's [`RetryConfig`]. Cloning a session shares its headers.
#[derive(Clone, Debug)]
pub struct Session {
    base_url: Url,
    headers: SharedHeaders,
    http: reqwest::blocking::Client,
    retry: RetryConfig,
}

impl Session {
    /// Creates a session with the given base URL.
    ///
    /// The URL is normalized to include a trailing slash, so relative endpoint
    /// paths join correctly.
    pub fn new(
        base_url: impl AsRef<str>,
        http: reqwest::blocking::Client,
        retry: RetryConfig,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.as_ref())
            .map_err(|_| ClientError::InvalidBaseUrl(base_url.as_ref().to_owned()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: ensure_trailing_slash(parsed),
            headers: Arc::new(RwLock::new(headers)),
            http,
            retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Handle on the default headers; changes apply to every later request.
    pub fn headers(&self) -> SharedHeaders {
        Arc::clone(&self.headers)
    }

    /// Installs `Authorization: Bearer <token>` in place.
    pub fn set_bearer_token(&self, token: &str) -> Result<(), ClientError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Current `Authorization` header value, if any.
    pub fn authorization(&self) -> Option<String> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    /// Sends a request and returns the raw response, whatever its status.
    ///
    /// Transient failures, as classified by [`RetryConfig`], are retried with
    /// capped exponential backoff; the last outcome is returned once the
    /// retry budget is spent.
    pub fn send(&self, request: &RequestSpec) -> Result<Response, ClientError> {
        let url = self.build_url(&request.path)?;
        let mut attempt = 0;
        loop {
            debug!(method = %request.method, %url, attempt, "sending request");
            let outcome = self.build_request(request, url.clone()).send();
            let retries_left = attempt < self.retry.max_retries;
            let replayable = RetryConfig::is_idempotent(&request.method);

            match outcome {
                Ok(response)
                    if retries_left && replayable && RetryConfig::is_transient(response.status()) =>
                {
                    warn!(status = %response.status(), %url, attempt, "transient response, retrying");
                }
                Err(error)
                    if retries_left && RetryConfig::is_transient_error(&error, &request.method) =>
                {
                    warn!(%error, %url, attempt, "request failed, retrying");
                }
                Ok(response) => return Ok(response),
                Err(error) => return Err(error.into()),
            }

            thread::sleep(self.retry.delay_for(attempt));
            attempt += 1;
        }
    }

    /// Sends a request and parses a successful response as JSON.
    pub fn request_json(&self, request: &RequestSpec) -> Result<Value, ClientError> {
        into_json(self.send(request)?)
    }

    fn build_request(&self, request: &RequestSpec, url: Url) -> reqwest::blocking::RequestBuilder {
        let headers = self
            .headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut builder = self.http.request(request.method.clone(), url).headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(json_body) = &request.body {
            builder = builder.json(json_body);
        }

        builder
    }

    fn build_url(&self, path: &str) -> Result<Url, ClientError> {
        let relative = path.trim_start_matches('/');
        self.base_url
            .join(relative)
            .map_err(|_| ClientError::InvalidPath(path.to_owned()))
    }
}

/// Checks the status of a response and parses its body as JSON.
///
/// Returns [`Value::Null`] for successful responses with an empty body.
pub fn into_json(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let url = response.url().to_string();
    let payload = response.text()?;

    if !status.is_success() {
        return Err(ClientError::HttpStatus {
            status,
            url,
            body: payload,
        });
    }

    if payload.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(&payload)?)
    }
}

pub(crate) fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}
