//! `Alexa` namespace state queries
//!
//! `ReportState` resolves each retrievable property individually through
//! the device-state collaborator; values that fail to resolve are skipped
//! rather than defaulted.

use super::ControllerContext;
use crate::response::ResponseEnvelope;
use crate::Error;

/// Answers `ReportState` with a `StateReport`
pub struct StateController {
    ctx: ControllerContext,
}

impl StateController {
    pub(crate) fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    /// Collect current values for every retrievable capability
    pub async fn process(mut self) -> ResponseEnvelope {
        if self.ctx.name != "ReportState" {
            return self
                .ctx
                .error_response(Error::UnsupportedName(self.ctx.name.clone()));
        }

        let capabilities = match self.ctx.capabilities().await {
            Ok(capabilities) => capabilities,
            Err(e) => return self.ctx.error_response(e),
        };
        let sku = match self.ctx.sku().await {
            Ok(sku) => sku,
            Err(e) => return self.ctx.error_response(e),
        };

        if let Ok(identity) = &self.ctx.identity {
            tracing::info!(
                user_id = %identity.user_id,
                endpoint_id = %self.ctx.endpoint_id,
                "creating state report"
            );
        }

        self.ctx.response.set_name("StateReport");

        for capability in capabilities.iter().filter(|c| c.is_reportable()) {
            let Some(property) = capability.properties.as_ref().and_then(|p| p.supported.first())
            else {
                continue;
            };

            let resolved = self
                .ctx
                .services
                .state
                .property_value(
                    &self.ctx.endpoint_id,
                    &property.name,
                    capability.instance.as_deref(),
                    &sku,
                )
                .await;

            match resolved {
                Ok(Some(value)) => self.ctx.response.add_context_property(
                    &capability.interface,
                    &property.name,
                    value,
                    0,
                    capability.instance.as_deref(),
                ),
                Ok(None) => {
                    tracing::debug!(property = %property.name, "no stored value for property");
                }
                Err(e) => {
                    tracing::warn!(property = %property.name, error = %e, "state read failed");
                }
            }
        }

        if self.ctx.response.context_properties().is_empty() {
            return self.ctx.error_response(Error::StateUnavailable);
        }
        self.ctx.response
    }
}
