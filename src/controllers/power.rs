//! `Alexa.PowerController` handling

use serde_json::json;

use super::ControllerContext;
use crate::response::ResponseEnvelope;

/// Turns an endpoint on or off
pub struct PowerController {
    ctx: ControllerContext,
}

impl PowerController {
    pub(crate) fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    /// Actuate the power state and report the applied value
    pub async fn process(mut self) -> ResponseEnvelope {
        let desired = if self.ctx.name == "TurnOn" { "ON" } else { "OFF" };

        let applied = self
            .ctx
            .services
            .state
            .apply_desired(&self.ctx.endpoint_id, "powerState", None, json!(desired))
            .await;

        match applied {
            Ok(value) => {
                self.ctx
                    .response
                    .add_context_property("Alexa.PowerController", "powerState", value, 0, None);
                self.ctx.response
            }
            Err(e) => {
                tracing::error!(endpoint_id = %self.ctx.endpoint_id, error = %e, "power actuation failed");
                self.ctx.error_response(e)
            }
        }
    }
}
