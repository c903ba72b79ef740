//! Response schema diagnostics
//!
//! Validation is advisory only: the router logs issues and returns the
//! envelope unchanged. Nothing on the hot path depends on a verdict.

use serde_json::Value;

/// Checks serialized envelopes against the message schema
pub trait SchemaValidator: Send + Sync {
    /// Validate one serialized envelope, returning the list of issues found
    ///
    /// # Errors
    ///
    /// Returns the issues when the envelope does not conform
    fn validate(&self, envelope: &Value) -> std::result::Result<(), Vec<String>>;
}

/// Structural checks over the response envelope shape
///
/// Verifies the header block, the payload, and the rule that a present
/// context carries properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeShapeValidator;

impl SchemaValidator for EnvelopeShapeValidator {
    fn validate(&self, envelope: &Value) -> std::result::Result<(), Vec<String>> {
        let mut issues = Vec::new();

        match envelope.pointer("/event/header") {
            None => issues.push("event.header is missing".to_string()),
            Some(header) => {
                for field in ["namespace", "name", "messageId", "payloadVersion"] {
                    let present = header
                        .get(field)
                        .and_then(Value::as_str)
                        .is_some_and(|value| !value.is_empty());
                    if !present {
                        issues.push(format!("event.header.{field} is missing"));
                    }
                }
            }
        }

        if envelope.pointer("/event/payload").is_none() {
            issues.push("event.payload is missing".to_string());
        }

        if let Some(context) = envelope.get("context") {
            let has_properties = context
                .get("properties")
                .and_then(Value::as_array)
                .is_some_and(|properties| !properties.is_empty());
            if !has_properties {
                issues.push("context present without properties".to_string());
            }
        }

        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseEnvelope;
    use serde_json::json;

    #[test]
    fn default_envelope_conforms() {
        let value = ResponseEnvelope::default().serialize(true);
        assert!(EnvelopeShapeValidator.validate(&value).is_ok());
    }

    #[test]
    fn missing_header_fields_are_reported() {
        let value = json!({"event": {"header": {"namespace": "Alexa"}, "payload": {}}});
        let issues = EnvelopeShapeValidator.validate(&value).unwrap_err();
        assert!(issues.iter().any(|i| i.contains("messageId")));
        assert!(issues.iter().any(|i| i.contains("payloadVersion")));
    }

    #[test]
    fn empty_context_is_an_issue() {
        let value = ResponseEnvelope::default().serialize(false);
        let issues = EnvelopeShapeValidator.validate(&value).unwrap_err();
        assert_eq!(issues, vec!["context present without properties".to_string()]);
    }
}
