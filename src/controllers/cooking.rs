//! `Alexa.Cooking` handling
//!
//! Cooking directives carry no device actuation on this gateway; a mode
//! change is acknowledged as-is.

use super::ControllerContext;
use crate::response::ResponseEnvelope;
use crate::Error;

/// Acknowledges cooking mode changes
pub struct CookingController {
    ctx: ControllerContext,
}

impl CookingController {
    pub(crate) fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    /// Acknowledge `SetCookingMode`; any other name is unsupported
    pub fn process(self) -> ResponseEnvelope {
        if self.ctx.name == "SetCookingMode" {
            return self.ctx.response;
        }
        self.ctx
            .error_response(Error::UnsupportedName(self.ctx.name.clone()))
    }
}
