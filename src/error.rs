//! Error types for the Hearth gateway
//!
//! Controller variants convert collaborator failures into `ErrorResponse`
//! envelopes locally; nothing in this taxonomy escapes the router as an
//! unhandled fault. The display strings double as the user-visible error
//! messages carried in response payloads.

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a directive
#[derive(Debug, Error)]
pub enum Error {
    /// Request arrived with no body at all
    #[error("Empty Body")]
    EmptyBody,

    /// No controller matched the directive namespace
    #[error("Empty Response: No response processed. Unhandled Directive.")]
    UnhandledDirective,

    /// Namespace matched but the directive name did not
    #[error("Name not supported {0}")]
    UnsupportedName(String),

    /// The device actuator rejected or failed the state change
    #[error("actuation failed: {0}")]
    Actuation(String),

    /// No retrievable property could be resolved for the endpoint
    #[error("Cannot get device state")]
    StateUnavailable,

    /// The caller's access token could not be exchanged for a user id
    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),

    /// Credential or endpoint store write failed
    #[error("{0}")]
    Persistence(String),

    /// Endpoint registry lookup failed
    #[error("registry error: {0}")]
    Registry(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
