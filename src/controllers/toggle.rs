//! `Alexa.ToggleController` handling
//!
//! Same pattern as the power controller, scoped by the directive instance
//! so one endpoint can carry several independent toggles.

use serde_json::json;

use super::ControllerContext;
use crate::response::ResponseEnvelope;

/// Flips one toggle instance of an endpoint
pub struct ToggleController {
    ctx: ControllerContext,
}

impl ToggleController {
    pub(crate) fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    /// Actuate the toggle state and report the applied value
    pub async fn process(mut self) -> ResponseEnvelope {
        let desired = if self.ctx.name == "TurnOff" { "OFF" } else { "ON" };

        let applied = self
            .ctx
            .services
            .state
            .apply_desired(
                &self.ctx.endpoint_id,
                "toggleState",
                Some(&self.ctx.instance),
                json!(desired),
            )
            .await;

        match applied {
            Ok(value) => {
                self.ctx.response.add_context_property(
                    "Alexa.ToggleController",
                    "toggleState",
                    value,
                    0,
                    Some(&self.ctx.instance),
                );
                self.ctx.response
            }
            Err(e) => {
                tracing::error!(
                    endpoint_id = %self.ctx.endpoint_id,
                    instance = %self.ctx.instance,
                    error = %e,
                    "toggle actuation failed"
                );
                self.ctx.error_response(e)
            }
        }
    }
}
