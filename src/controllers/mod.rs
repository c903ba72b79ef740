//! Capability controllers
//!
//! Each inbound directive is handled by exactly one controller variant,
//! selected by namespace. Variants share a [`ControllerContext`] that
//! parses the directive, resolves the caller identity, and owns the
//! response envelope under assembly.

mod authorization;
mod cooking;
mod power;
mod range;
mod state;
mod toggle;

pub use authorization::AuthorizationController;
pub use cooking::CookingController;
pub use power::PowerController;
pub use range::RangeController;
pub use state::StateController;
pub use toggle::ToggleController;

use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::config::OauthConfig;
use crate::directive::Directive;
use crate::endpoint::{Capability, EndpointRecord};
use crate::response::{EnvelopeOptions, ResponseEnvelope};
use crate::stores::{IdentityOutcome, Services};
use crate::{Error, Result};

/// Per-request state shared by every controller variant
///
/// Parsed once from the directive and immutable afterwards, apart from the
/// response envelope the variant assembles. One context instance belongs to
/// exactly one invocation; the endpoint memoization is never shared.
pub struct ControllerContext {
    pub(crate) services: Services,
    pub(crate) payload: Value,
    pub(crate) name: String,
    pub(crate) correlation_token: Option<String>,
    pub(crate) instance: String,
    pub(crate) token: String,
    pub(crate) endpoint_id: String,
    pub(crate) identity: IdentityOutcome,
    pub(crate) response: ResponseEnvelope,
    endpoint: OnceCell<EndpointRecord>,
}

impl ControllerContext {
    /// Parse a directive and resolve the caller identity
    ///
    /// Identity failures are stored, not raised; the variant decides how to
    /// react.
    pub async fn from_directive(directive: &Directive, services: Services) -> Self {
        // AcceptGrant carries its token in the grantee block instead of an
        // endpoint scope
        let token = directive
            .scope_token()
            .or_else(|| directive.grantee_token())
            .unwrap_or_default()
            .to_string();
        let endpoint_id = directive.endpoint_id().to_string();
        let correlation_token = directive.header.correlation_token.clone();

        let identity = services.identity.resolve(&token).await;
        if let Err(e) = &identity {
            tracing::debug!(error = %e, "identity resolution failed");
        }

        let response = ResponseEnvelope::new(EnvelopeOptions {
            token: token.clone(),
            correlation_token: correlation_token.clone(),
            endpoint_id: endpoint_id.clone(),
            ..EnvelopeOptions::default()
        });

        Self {
            services,
            payload: directive.payload.clone(),
            name: directive.header.name.clone(),
            correlation_token,
            instance: directive.header.instance.clone().unwrap_or_default(),
            token,
            endpoint_id,
            identity,
            response,
            endpoint: OnceCell::new(),
        }
    }

    /// Directive operation name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity-resolution outcome for this request
    #[must_use]
    pub fn identity(&self) -> &IdentityOutcome {
        &self.identity
    }

    /// Fetch and memoize the endpoint record; one registry read per request
    pub async fn endpoint(&self) -> Result<&EndpointRecord> {
        self.endpoint
            .get_or_try_init(|| async {
                self.services
                    .registry
                    .endpoint(&self.endpoint_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Registry(format!("endpoint {} not found", self.endpoint_id))
                    })
            })
            .await
    }

    /// Capability declarations of the targeted endpoint
    pub async fn capabilities(&self) -> Result<Vec<Capability>> {
        self.endpoint().await?.parsed_capabilities()
    }

    /// Product type code of the targeted endpoint
    pub async fn sku(&self) -> Result<String> {
        Ok(self.endpoint().await?.sku.clone())
    }

    /// Build the uniform error envelope
    ///
    /// Preserves token, correlation token and endpoint id from this
    /// context; never fails.
    #[must_use]
    pub fn error_response(&self, error: impl std::fmt::Display) -> ResponseEnvelope {
        let mut response = ResponseEnvelope::new(EnvelopeOptions {
            name: "ErrorResponse".to_string(),
            token: self.token.clone(),
            correlation_token: self.correlation_token.clone(),
            endpoint_id: self.endpoint_id.clone(),
            ..EnvelopeOptions::default()
        });
        response.set_payload(json!({
            "message": {"error_description": error.to_string()}
        }));
        response
    }
}

/// Closed set of capability controllers, one per directive namespace
pub enum CapabilityController {
    /// `Alexa` state queries
    StateQuery(StateController),
    /// `Alexa.Authorization` grant handling
    Authorization(AuthorizationController),
    /// `Alexa.PowerController` on/off
    Power(PowerController),
    /// `Alexa.ToggleController` on/off scoped by instance
    Toggle(ToggleController),
    /// `Alexa.RangeController` set/adjust
    Range(RangeController),
    /// `Alexa.Cooking` mode changes
    Cooking(CookingController),
}

impl CapabilityController {
    /// Select the controller variant for a directive namespace
    ///
    /// Returns `None` for namespaces the gateway has no controller for; the
    /// context (and its identity-resolution call) is only built when a
    /// variant matched.
    pub async fn for_namespace(
        namespace: &str,
        directive: &Directive,
        services: Services,
    ) -> Option<Self> {
        let make: fn(ControllerContext) -> Self = match namespace {
            "Alexa" => |ctx| Self::StateQuery(StateController::new(ctx)),
            "Alexa.Authorization" => |ctx| Self::Authorization(AuthorizationController::new(ctx)),
            "Alexa.PowerController" => |ctx| Self::Power(PowerController::new(ctx)),
            "Alexa.ToggleController" => |ctx| Self::Toggle(ToggleController::new(ctx)),
            "Alexa.RangeController" => |ctx| Self::Range(RangeController::new(ctx)),
            "Alexa.Cooking" => |ctx| Self::Cooking(CookingController::new(ctx)),
            _ => return None,
        };
        Some(make(ControllerContext::from_directive(directive, services).await))
    }

    /// Run the selected controller to completion
    ///
    /// OAuth client parameters are forwarded only to the authorization
    /// variant. Always yields an envelope; failures become `ErrorResponse`.
    pub async fn process(self, oauth: &OauthConfig) -> ResponseEnvelope {
        match self {
            Self::StateQuery(controller) => controller.process().await,
            Self::Authorization(controller) => controller.process(oauth).await,
            Self::Power(controller) => controller.process().await,
            Self::Toggle(controller) => controller.process().await,
            Self::Range(controller) => controller.process().await,
            Self::Cooking(controller) => controller.process(),
        }
    }
}
