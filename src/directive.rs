//! Inbound directive wire model
//!
//! A directive is a command or query addressed to one endpoint and one
//! capability interface. The JSON shape reproduces the Alexa Smart Home v3
//! request envelope field for field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level request document wrapping a single directive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveRequest {
    /// The directive being delivered
    pub directive: Directive,
}

/// An inbound command or query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    /// Namespace, name and message identity
    pub header: DirectiveHeader,

    /// Target endpoint; absent for discovery and authorization directives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<DirectiveEndpoint>,

    /// Interface-specific arguments
    #[serde(default)]
    pub payload: Value,
}

/// Directive header block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    /// Capability interface namespace (e.g. `Alexa.PowerController`)
    pub namespace: String,

    /// Operation name within the namespace (e.g. `TurnOn`)
    pub name: String,

    /// Sender-assigned message id
    #[serde(default)]
    pub message_id: String,

    /// Protocol payload version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_version: Option<String>,

    /// Opaque token echoed back in the response header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,

    /// Discriminator for multiple controllers of one interface type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Directive endpoint block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    /// Bearer scope carrying the caller's access token
    pub scope: DirectiveScope,

    /// Stable identifier of the targeted endpoint
    pub endpoint_id: String,

    /// Opaque key/value pairs set at discovery time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<serde_json::Map<String, Value>>,
}

/// Token scope of a directive endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveScope {
    /// Scope type, `BearerToken` on this protocol version
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<String>,

    /// The caller's access token
    pub token: String,
}

impl Directive {
    /// Access token from the endpoint scope, if the directive targets one
    #[must_use]
    pub fn scope_token(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.scope.token.as_str())
    }

    /// Grantee token carried by `AcceptGrant` payloads
    #[must_use]
    pub fn grantee_token(&self) -> Option<&str> {
        self.payload.pointer("/grantee/token").and_then(Value::as_str)
    }

    /// Access token carried in the payload scope of discovery directives
    #[must_use]
    pub fn payload_scope_token(&self) -> Option<&str> {
        self.payload.pointer("/scope/token").and_then(Value::as_str)
    }

    /// Identifier of the targeted endpoint, empty when none is addressed
    #[must_use]
    pub fn endpoint_id(&self) -> &str {
        self.endpoint.as_ref().map_or("", |e| e.endpoint_id.as_str())
    }
}
