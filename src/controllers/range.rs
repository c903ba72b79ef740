//! `Alexa.RangeController` handling
//!
//! Set and adjust operations are clamped into the `supportedRange` the
//! endpoint declared for the targeted instance.

use serde_json::{json, Value};

use super::ControllerContext;
use crate::response::ResponseEnvelope;
use crate::Error;

/// Sets or adjusts one range instance of an endpoint
pub struct RangeController {
    ctx: ControllerContext,
}

/// Integral results stay integers on the wire
#[allow(clippy::cast_possible_truncation)]
fn wire_number(value: f64) -> Value {
    if value.fract() == 0.0 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

impl RangeController {
    pub(crate) fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    /// Compute the clamped target value, report it, then persist it
    ///
    /// The context property is appended before persistence; when the write
    /// fails a fresh error envelope is returned instead, discarding the
    /// appended property.
    pub async fn process(mut self) -> ResponseEnvelope {
        let capabilities = match self.ctx.capabilities().await {
            Ok(capabilities) => capabilities,
            Err(e) => return self.ctx.error_response(e),
        };

        let Some(range) = capabilities
            .iter()
            .filter(|c| c.instance.as_deref() == Some(self.ctx.instance.as_str()))
            .find_map(crate::endpoint::Capability::supported_range)
        else {
            return self.ctx.error_response(format!(
                "no supported range for instance {}",
                self.ctx.instance
            ));
        };

        let value = match self.ctx.name.as_str() {
            "SetRangeValue" => {
                let Some(requested) = self.ctx.payload.get("rangeValue").and_then(Value::as_f64)
                else {
                    return self.ctx.error_response("missing rangeValue");
                };
                range.clamp(requested)
            }
            "AdjustRangeValue" => {
                let delta_default = self
                    .ctx
                    .payload
                    .get("rangeValueDeltaDefault")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                // The user gave no magnitude; move by one precision step
                let delta = if delta_default {
                    range.precision
                } else {
                    match self.ctx.payload.get("rangeValueDelta").and_then(Value::as_f64) {
                        Some(delta) => delta,
                        None => return self.ctx.error_response("missing rangeValueDelta"),
                    }
                };

                let sku = match self.ctx.sku().await {
                    Ok(sku) => sku,
                    Err(e) => return self.ctx.error_response(e),
                };
                let current = match self
                    .ctx
                    .services
                    .state
                    .property_value(
                        &self.ctx.endpoint_id,
                        "rangeValue",
                        Some(&self.ctx.instance),
                        &sku,
                    )
                    .await
                {
                    // Unset shadow values adjust from zero
                    Ok(stored) => stored.and_then(|v| v.as_f64()).unwrap_or(0.0),
                    Err(e) => return self.ctx.error_response(e),
                };
                range.clamp(current + delta)
            }
            other => return self.ctx.error_response(Error::UnsupportedName(other.to_string())),
        };

        let reported = wire_number(value);
        self.ctx.response.add_context_property(
            "Alexa.RangeController",
            "rangeValue",
            reported.clone(),
            0,
            Some(&self.ctx.instance),
        );

        if let Err(e) = self
            .ctx
            .services
            .state
            .apply_desired(
                &self.ctx.endpoint_id,
                "rangeValue",
                Some(&self.ctx.instance),
                reported,
            )
            .await
        {
            tracing::error!(
                endpoint_id = %self.ctx.endpoint_id,
                instance = %self.ctx.instance,
                error = %e,
                "range persistence failed"
            );
            return self.ctx.error_response(e);
        }

        self.ctx.response
    }
}
