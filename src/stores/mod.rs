//! Collaborator contracts for external services
//!
//! The gateway core reaches its persistence and device back ends only
//! through these narrow traits. In-memory implementations live in
//! [`memory`]; network-backed OAuth and identity implementations live in
//! [`crate::auth`]. Failures surface as values so the router can always
//! produce a well-formed envelope.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::OauthConfig;
use crate::endpoint::EndpointRecord;
use crate::Result;

/// Resolved caller identity
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    /// User id the access token maps to
    pub user_id: String,
}

/// Identity-resolution failure, surfaced as a value
#[derive(Debug, Clone)]
pub struct IdentityError {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable description
    pub error_description: String,
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.error_description)
    }
}

/// Outcome of exchanging an access token for a user id
pub type IdentityOutcome = std::result::Result<ResolvedIdentity, IdentityError>;

/// Exchanges access tokens for caller identities
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the user id behind an access token
    async fn resolve(&self, token: &str) -> IdentityOutcome;
}

/// System of record for endpoint registrations
#[async_trait]
pub trait EndpointRegistry: Send + Sync {
    /// Fetch one endpoint record, `None` when the id is unknown
    async fn endpoint(&self, endpoint_id: &str) -> Result<Option<EndpointRecord>>;

    /// List the ids of all endpoints owned by a user
    async fn list_endpoints(&self, user_id: &str) -> Result<Vec<String>>;

    /// Create or replace an endpoint record
    async fn upsert_endpoint(&self, record: EndpointRecord) -> Result<()>;

    /// Remove an endpoint record
    async fn delete_endpoint(&self, endpoint_id: &str) -> Result<()>;
}

/// Last-known/desired property values of endpoints
///
/// Values are keyed by endpoint, property name and optional controller
/// instance. Consistency across concurrent writers is this store's
/// responsibility, not the router's.
#[async_trait]
pub trait DeviceStateStore: Send + Sync {
    /// Read the last-known value of one property, `None` when unset
    async fn property_value(
        &self,
        endpoint_id: &str,
        property_name: &str,
        instance: Option<&str>,
        sku: &str,
    ) -> Result<Option<Value>>;

    /// Apply a desired property value, returning the value actually applied
    async fn apply_desired(
        &self,
        endpoint_id: &str,
        property_name: &str,
        instance: Option<&str>,
        value: Value,
    ) -> Result<Value>;
}

/// Token grant returned by the OAuth authorization server
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// Bearer token for acting on the user's behalf
    pub access_token: String,
    /// Token used to obtain fresh access tokens
    pub refresh_token: String,
    /// Token type, `Bearer` in practice
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
}

/// Error-shaped response from the OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeError {
    /// OAuth error code (e.g. `invalid_grant`)
    pub error: String,
    /// Human-readable description
    #[serde(default)]
    pub error_description: String,
}

impl ExchangeError {
    /// Wrap a transport-level failure in the OAuth error shape
    #[must_use]
    pub fn transport(error: impl std::fmt::Display) -> Self {
        Self {
            error: "request_failed".to_string(),
            error_description: error.to_string(),
        }
    }
}

impl std::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.error_description)
    }
}

/// Exchanges OAuth grant codes for token grants
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange an authorization grant code for access and refresh tokens
    async fn exchange_grant_code(
        &self,
        code: &str,
        oauth: &OauthConfig,
    ) -> std::result::Result<TokenGrant, ExchangeError>;
}

/// Stored user credential produced by an accepted grant
#[derive(Debug, Clone)]
pub struct UserCredential {
    /// User the credential belongs to
    pub user_id: String,
    /// Grant code that was exchanged
    pub grant_code: String,
    /// Grantee token the grant arrived with
    pub grantee_token: String,
    /// Issued access token
    pub access_token: String,
    /// Issued refresh token
    pub refresh_token: String,
    /// Token type as reported by the authorization server
    pub token_type: String,
    /// OAuth client id the tokens were issued to
    pub client_id: String,
    /// OAuth client secret used for the exchange
    pub client_secret: String,
    /// Redirect URI used for the exchange
    pub redirect_uri: String,
    /// Access-token expiry in wire timestamp form
    pub expiration_utc: String,
}

/// Persists user credentials from accepted grants
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store or replace the credential for a user
    async fn put_user(&self, credential: UserCredential) -> Result<()>;
}

/// Trait-object bundle handed to every controller context
#[derive(Clone)]
pub struct Services {
    /// Access-token to user-id resolution
    pub identity: Arc<dyn IdentityResolver>,
    /// Endpoint registrations
    pub registry: Arc<dyn EndpointRegistry>,
    /// Device shadow state
    pub state: Arc<dyn DeviceStateStore>,
    /// OAuth grant-code exchange
    pub exchanger: Arc<dyn TokenExchanger>,
    /// User credential persistence
    pub credentials: Arc<dyn CredentialStore>,
}
