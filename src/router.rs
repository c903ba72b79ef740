//! Directive routing
//!
//! Maps an inbound directive to its capability controller by namespace and
//! guarantees a well-formed response envelope for any input, including
//! empty and malformed bodies.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::OauthConfig;
use crate::controllers::CapabilityController;
use crate::directive::{Directive, DirectiveRequest};
use crate::response::{EnvelopeOptions, PayloadEndpoint, ResponseEnvelope};
use crate::schema::SchemaValidator;
use crate::stores::Services;
use crate::Error;

/// Development sentinel token from the discovery samples
const DEVELOPMENT_TOKEN: &str = "access-token-from-skill";

/// User id assumed when the development sentinel token is presented
const DEVELOPMENT_USER_ID: &str = "0";

/// Routes directives to capability controllers
pub struct DirectiveRouter {
    services: Services,
    oauth: OauthConfig,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl DirectiveRouter {
    /// Create a router over a set of collaborators
    #[must_use]
    pub fn new(services: Services, oauth: OauthConfig) -> Self {
        Self { services, oauth, validator: None }
    }

    /// Attach a schema validator for response diagnostics
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Process one raw directive document into a serialized response
    ///
    /// Never fails: malformed or unrecognized input degrades to an
    /// `ErrorResponse` envelope.
    pub async fn route(&self, body: &str) -> Value {
        if body.trim().is_empty() {
            return self.finish(internal_error_envelope(&Error::EmptyBody));
        }

        let directive = match serde_json::from_str::<DirectiveRequest>(body) {
            Ok(request) => request.directive,
            Err(e) => {
                tracing::warn!(error = %e, "directive body did not parse");
                return self.finish(internal_error_envelope(&Error::UnhandledDirective));
            }
        };

        let namespace = directive.header.namespace.clone();
        tracing::debug!(namespace = %namespace, name = %directive.header.name, "routing directive");

        let response = match namespace.as_str() {
            "Alexa.Discovery" if directive.header.name == "Discover" => {
                self.discover(&directive).await
            }
            "Alexa.ModeController" => {
                let mut envelope = ResponseEnvelope::new(EnvelopeOptions {
                    name: "ErrorResponse".to_string(),
                    ..EnvelopeOptions::default()
                });
                envelope.set_payload(json!({
                    "type": "INTERNAL_ERROR",
                    "message": "Not Yet Implemented"
                }));
                envelope
            }
            _ => {
                match CapabilityController::for_namespace(
                    &namespace,
                    &directive,
                    self.services.clone(),
                )
                .await
                {
                    Some(controller) => controller.process(&self.oauth).await,
                    None => {
                        tracing::warn!(namespace = %namespace, "no controller for namespace");
                        internal_error_envelope(&Error::UnhandledDirective)
                    }
                }
            }
        };

        self.finish(response)
    }

    /// Enumerate the caller's endpoints into a `Discover.Response`
    async fn discover(&self, directive: &Directive) -> ResponseEnvelope {
        let token = directive.payload_scope_token().unwrap_or_default();

        let user_id = if token == DEVELOPMENT_TOKEN {
            tracing::warn!("development token presented; assuming user id {DEVELOPMENT_USER_ID}");
            DEVELOPMENT_USER_ID.to_string()
        } else {
            match self.services.identity.resolve(token).await {
                Ok(identity) => identity.user_id,
                Err(e) => {
                    tracing::error!(error = %e, "discovery identity resolution failed");
                    return internal_error_envelope(&Error::IdentityResolution(e.to_string()));
                }
            }
        };

        let endpoint_ids = match self.services.registry.list_endpoints(&user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "endpoint listing failed");
                return internal_error_envelope(&e);
            }
        };

        let mut envelope = ResponseEnvelope::new(EnvelopeOptions {
            namespace: "Alexa.Discovery".to_string(),
            name: "Discover.Response".to_string(),
            ..EnvelopeOptions::default()
        });

        for endpoint_id in endpoint_ids {
            let record = match self.services.registry.endpoint(&endpoint_id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::warn!(endpoint_id = %endpoint_id, "listed endpoint has no record");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(endpoint_id = %endpoint_id, error = %e, "endpoint read failed");
                    continue;
                }
            };

            let capabilities = match record.capabilities_value() {
                Ok(capabilities) => capabilities,
                Err(e) => {
                    tracing::warn!(endpoint_id = %endpoint_id, error = %e, "stored capabilities did not parse");
                    continue;
                }
            };

            tracing::info!(endpoint_id = %endpoint_id, user_id = %user_id, "discovered endpoint");
            envelope.add_payload_endpoint(PayloadEndpoint {
                endpoint_id: record.endpoint_id,
                friendly_name: record.friendly_name,
                manufacturer_name: record.manufacturer_name,
                display_categories: record.display_categories,
                capabilities,
                ..PayloadEndpoint::default()
            });
        }

        envelope
    }

    /// Serialize the envelope and run the diagnostics validator
    fn finish(&self, envelope: ResponseEnvelope) -> Value {
        let value = envelope.serialize(true);
        if let Some(validator) = &self.validator {
            if let Err(issues) = validator.validate(&value) {
                tracing::warn!(issues = ?issues, "response failed schema validation");
            }
        }
        tracing::debug!(response = %value, "directive response");
        value
    }
}

/// Router-level error envelope with the `{type, message}` payload shape
fn internal_error_envelope(message: &impl std::fmt::Display) -> ResponseEnvelope {
    let mut envelope = ResponseEnvelope::new(EnvelopeOptions {
        name: "ErrorResponse".to_string(),
        ..EnvelopeOptions::default()
    });
    envelope.set_payload(json!({
        "type": "INTERNAL_ERROR",
        "message": message.to_string()
    }));
    envelope
}
