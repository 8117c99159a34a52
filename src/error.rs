use thiserror::Error;

use crate::GrantStrategy;

/// Errors raised while mapping wire payloads to resources and back.
///
/// These describe a data or contract mismatch and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A wire value failed a field-level constraint.
    #[error("invalid value for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// The discriminator carried a tag no registered schema handles.
    #[error("unrecognized '{field}' discriminator value '{tag}'")]
    UnknownDiscriminator { field: String, tag: String },

    /// The discriminator key was absent or not a string.
    #[error("missing or non-string discriminator field '{field}'")]
    MissingDiscriminator { field: String },

    /// A resource payload was not a JSON object.
    #[error("expected a JSON object for {kind}")]
    NotAnObject { kind: String },
}

impl SchemaError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by session, authentication and client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the base URL.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body could not be parsed as JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP status with response payload.
    #[error("server returned status {status} for {url}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    /// The token endpoint rejected the grant.
    #[error("authentication failed: {message}")]
    Authentication {
        status: Option<reqwest::StatusCode>,
        message: String,
    },

    /// None of the supported grant strategies can be built from the credentials.
    #[error("no usable credentials: supply an access token, username and password, a refresh token or a client secret")]
    MissingCredentials,

    /// The grant strategy requires a credential that is not available.
    #[error("{strategy} grant requires '{field}'")]
    MissingCredential {
        strategy: GrantStrategy,
        field: &'static str,
    },

    /// A token exchange is needed but no token endpoint is configured.
    #[error("no token endpoint or authorization URL configured")]
    MissingTokenEndpoint,

    /// An access token could not be encoded as an HTTP header value.
    #[error("invalid authorization header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// A typed payload could not be loaded or dumped.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A configuration value could not be parsed.
    #[error("invalid configuration value for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}

impl ClientError {
    /// Returns the HTTP status for status-derived errors.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Authentication { status, .. } => *status,
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}
