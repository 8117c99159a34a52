//! Typed resource mapping and authenticated sessions for the job, auth and
//! resource management REST services.
//!
//! Public API layers:
//! - [`resource!`]/[`one_of!`]/[`wire_enum!`]: declare resources, tagged
//!   unions and string enumerations together with their [`Schema`].
//! - [`Field`]: tri-state field value keeping "not supplied" apart from
//!   explicit `null`.
//! - [`Client`]: authenticated client that refreshes its token once on 401.
//! - [`Session`]: shared-header HTTP session with transient-failure retries.
//! - [`ClientError`]/[`SchemaError`]: error types used by all operations.
//!
//! Per-resource modules only need [`Schema::load`], [`Schema::dump`], the
//! request methods of [`Client`] and [`Client::refresh_access_token`].

mod auth;
mod client;
mod config;
mod error;
mod field;
pub mod fieldset;
pub mod models;
mod resource;
mod retry;
mod schema;
mod session;
mod wire;

/// OAuth2 token acquisition.
pub use auth::{Authenticator, Credentials, DiscoveryDocument, GrantStrategy, TokenSet, discover};
/// Authenticated client.
pub use client::Client;
/// Client configuration.
pub use config::{AuthConfig, ClientConfig};
/// Error types returned by all operations.
pub use error::{ClientError, SchemaError};
/// Field values and metadata.
pub use field::{Direction, Field, FieldDescriptor};
/// Resource records and their schema helpers.
pub use resource::{Resource, dump_resource, load_resource};
/// Transient-failure retry policy.
pub use retry::RetryConfig;
/// Wire payload transforms.
pub use schema::Schema;
/// HTTP session.
pub use session::{RequestSpec, Session, SharedHeaders, into_json};
/// Secret wrapper used for tokens and passwords.
pub use secrecy::{ExposeSecret, SecretString};
/// Per-field wire conversion.
pub use wire::WireValue;

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json::{Map, Value};

    pub use crate::resource::{dump_resource, load_resource};
    pub use crate::schema::{discriminator_tag, without_discriminator};
}
