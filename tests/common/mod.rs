//! Shared fixtures for integration tests

use std::sync::Arc;

use serde_json::{json, Value};

use hearth_gateway::stores::memory::{
    MemoryCredentialStore, MemoryRegistry, MemoryStateStore, StaticIdentityResolver,
    StaticTokenExchanger,
};
use hearth_gateway::stores::{EndpointRegistry, Services, TokenGrant};
use hearth_gateway::{
    Capability, DirectiveRouter, EndpointRecord, EnvelopeShapeValidator, OauthConfig,
};

pub const TEST_TOKEN: &str = "access-token-test";
pub const TEST_USER: &str = "user-01";
pub const TEST_GRANT_CODE: &str = "grant-code-1";

pub fn oauth_config() -> OauthConfig {
    OauthConfig {
        client_id: "client-1".to_string(),
        client_secret: "secret-1".to_string(),
        redirect_uri: "https://example.invalid/callback".to_string(),
    }
}

pub fn power_capability() -> Capability {
    Capability::new("Alexa.PowerController").with_supported(&["powerState"], true, true)
}

pub fn toggle_capability(instance: &str) -> Capability {
    Capability::new("Alexa.ToggleController")
        .with_instance(instance)
        .with_supported(&["toggleState"], true, true)
}

pub fn range_capability(instance: &str, minimum: i64, maximum: i64, precision: i64) -> Capability {
    Capability::new("Alexa.RangeController")
        .with_instance(instance)
        .with_supported(&["rangeValue"], false, true)
        .with_configuration(json!({
            "supportedRange": {
                "minimumValue": minimum,
                "maximumValue": maximum,
                "precision": precision
            }
        }))
}

pub fn endpoint_with(
    endpoint_id: &str,
    user_id: &str,
    capabilities: &[Capability],
) -> EndpointRecord {
    EndpointRecord {
        endpoint_id: endpoint_id.to_string(),
        user_id: user_id.to_string(),
        capabilities: serde_json::to_string(capabilities).unwrap(),
        ..EndpointRecord::sample()
    }
}

/// Memory-backed services plus handles to the stores tests inspect
pub struct TestServices {
    pub services: Services,
    pub state: Arc<MemoryStateStore>,
    pub credentials: Arc<MemoryCredentialStore>,
}

pub async fn default_services(records: Vec<EndpointRecord>) -> TestServices {
    let registry = Arc::new(MemoryRegistry::new());
    for record in records {
        registry.upsert_endpoint(record).await.unwrap();
    }

    let state = Arc::new(MemoryStateStore::new());
    let credentials = Arc::new(MemoryCredentialStore::new());

    let services = Services {
        identity: Arc::new(StaticIdentityResolver::new().with_token(TEST_TOKEN, TEST_USER)),
        registry,
        state: state.clone(),
        exchanger: Arc::new(StaticTokenExchanger::new().with_grant(
            TEST_GRANT_CODE,
            TokenGrant {
                access_token: "access-1".to_string(),
                refresh_token: "refresh-1".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 9000,
            },
        )),
        credentials: credentials.clone(),
    };

    TestServices { services, state, credentials }
}

pub fn router(services: Services) -> DirectiveRouter {
    DirectiveRouter::new(services, oauth_config()).with_validator(Arc::new(EnvelopeShapeValidator))
}

/// A directive targeting one endpoint, in full wire form
pub fn directive_body(
    namespace: &str,
    name: &str,
    endpoint_id: &str,
    instance: Option<&str>,
    payload: Value,
) -> String {
    let mut header = json!({
        "namespace": namespace,
        "name": name,
        "payloadVersion": "3",
        "messageId": "b85fa90f-d311-44aa-b63e-ec0f38b58d53",
        "correlationToken": "corr-1"
    });
    if let Some(instance) = instance {
        header["instance"] = json!(instance);
    }

    json!({
        "directive": {
            "header": header,
            "endpoint": {
                "scope": {"type": "BearerToken", "token": TEST_TOKEN},
                "endpointId": endpoint_id,
                "cookie": {}
            },
            "payload": payload
        }
    })
    .to_string()
}

/// An `AcceptGrant` directive; carries no endpoint block
pub fn accept_grant_body(code: &str, grantee_token: &str) -> String {
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa.Authorization",
                "name": "AcceptGrant",
                "payloadVersion": "3",
                "messageId": "5e1d2337-5e1c-42c8-a0a5-897306a53a00"
            },
            "payload": {
                "grant": {"type": "OAuth2.AuthorizationCode", "code": code},
                "grantee": {"type": "BearerToken", "token": grantee_token}
            }
        }
    })
    .to_string()
}

/// A `Discover` directive with the token in the payload scope
pub fn discovery_body(token: &str) -> String {
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "Discover",
                "payloadVersion": "3",
                "messageId": "0f0f0f0f-0f0f-0f0f-0f0f-0f0f0f0f0f0f"
            },
            "payload": {
                "scope": {"type": "BearerToken", "token": token}
            }
        }
    })
    .to_string()
}
