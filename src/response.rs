//! Response envelope construction
//!
//! Builds the outgoing message structure (context + event) with the
//! conditional-field rules of the Alexa Smart Home v3 response schema:
//! the endpoint block is dropped for endpoint-free event names, and an
//! empty context is elided entirely at serialization time.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::endpoint;

/// Wire rendering of UTC instants (`timeOfSample`, credential expiry)
pub(crate) const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.00Z";

/// Event names that never carry an endpoint block
const ENDPOINT_FREE_NAMES: [&str; 2] = ["AcceptGrant.Response", "Discover.Response"];

fn utc_timestamp() -> String {
    chrono::Utc::now().format(WIRE_TIMESTAMP_FORMAT).to_string()
}

/// A reported current value of one capability property
#[derive(Debug, Clone)]
pub struct ContextProperty {
    /// Interface namespace the property belongs to
    pub namespace: String,
    /// Property name within the interface
    pub name: String,
    /// Reported value
    pub value: Value,
    /// When the value was sampled
    pub time_of_sample: String,
    /// Sampling uncertainty in milliseconds
    pub uncertainty_in_milliseconds: u64,
    /// Controller instance the property is scoped to
    pub instance: Option<String>,
}

impl ContextProperty {
    fn to_value(&self) -> Value {
        let mut property = json!({
            "namespace": self.namespace,
            "name": self.name,
            "value": self.value,
            "timeOfSample": self.time_of_sample,
            "uncertaintyInMilliseconds": self.uncertainty_in_milliseconds,
        });
        if let (Some(instance), Some(map)) = (&self.instance, property.as_object_mut()) {
            map.insert("instance".to_string(), json!(instance));
        }
        property
    }
}

/// Endpoint descriptor reported in a `Discover.Response` payload
#[derive(Debug, Clone)]
pub struct PayloadEndpoint {
    /// Stable endpoint identifier
    pub endpoint_id: String,
    /// Name the user refers to the endpoint by
    pub friendly_name: String,
    /// Human-readable endpoint description
    pub description: String,
    /// Endpoint manufacturer
    pub manufacturer_name: String,
    /// Display categories for companion-app grouping
    pub display_categories: Vec<String>,
    /// Capability declarations, already in wire form
    pub capabilities: Value,
    /// Opaque key/value pairs echoed back on later directives
    pub cookie: Option<Map<String, Value>>,
}

impl Default for PayloadEndpoint {
    fn default() -> Self {
        Self {
            endpoint_id: endpoint::generated_endpoint_id(),
            friendly_name: "Sample Endpoint".to_string(),
            description: "Sample Endpoint Description".to_string(),
            manufacturer_name: "Sample Manufacturer".to_string(),
            display_categories: vec!["OTHER".to_string()],
            capabilities: Value::Array(Vec::new()),
            cookie: None,
        }
    }
}

impl PayloadEndpoint {
    fn to_value(&self) -> Value {
        let mut descriptor = json!({
            "capabilities": self.capabilities,
            "description": self.description,
            "displayCategories": self.display_categories,
            "endpointId": self.endpoint_id,
            "friendlyName": self.friendly_name,
            "manufacturerName": self.manufacturer_name,
        });
        if let (Some(cookie), Some(map)) = (&self.cookie, descriptor.as_object_mut()) {
            map.insert("cookie".to_string(), json!(cookie));
        }
        descriptor
    }
}

/// Construction inputs for [`ResponseEnvelope`]
///
/// Every field has a documented default; callers override only what differs
/// from a plain `Alexa.Response`.
#[derive(Debug, Clone)]
pub struct EnvelopeOptions {
    /// Event header namespace (default `Alexa`)
    pub namespace: String,
    /// Event header name (default `Response`)
    pub name: String,
    /// Protocol payload version (default `3`)
    pub payload_version: String,
    /// Bearer token for the endpoint scope (default `INVALID`)
    pub token: String,
    /// Correlation token echoed from the directive
    pub correlation_token: Option<String>,
    /// Target endpoint id (default `INVALID`)
    pub endpoint_id: String,
    /// Initial endpoint cookie entries; `None` leaves the block out
    pub cookie: Option<Map<String, Value>>,
    /// Initial event payload (default empty object)
    pub payload: Value,
    /// Drop the endpoint block regardless of the event name
    pub remove_endpoint: bool,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            namespace: "Alexa".to_string(),
            name: "Response".to_string(),
            payload_version: "3".to_string(),
            token: "INVALID".to_string(),
            correlation_token: None,
            endpoint_id: "INVALID".to_string(),
            cookie: None,
            payload: Value::Object(Map::new()),
            remove_endpoint: false,
        }
    }
}

#[derive(Debug, Clone)]
struct EndpointBlock {
    token: String,
    endpoint_id: String,
    cookie: Option<Map<String, Value>>,
}

/// Outgoing response message under assembly
///
/// Constructed fresh per request with a new unique message id; discarded
/// after [`ResponseEnvelope::serialize`].
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    namespace: String,
    name: String,
    message_id: String,
    payload_version: String,
    correlation_token: Option<String>,
    endpoint: Option<EndpointBlock>,
    payload: Value,
    context_properties: Vec<ContextProperty>,
    payload_endpoints: Vec<PayloadEndpoint>,
}

impl ResponseEnvelope {
    /// Build an envelope from explicit options
    #[must_use]
    pub fn new(options: EnvelopeOptions) -> Self {
        let endpoint_free =
            options.remove_endpoint || ENDPOINT_FREE_NAMES.contains(&options.name.as_str());
        let endpoint = if endpoint_free {
            None
        } else {
            Some(EndpointBlock {
                token: options.token,
                endpoint_id: options.endpoint_id,
                cookie: options.cookie,
            })
        };

        Self {
            namespace: options.namespace,
            name: options.name,
            message_id: Uuid::new_v4().to_string(),
            payload_version: options.payload_version,
            correlation_token: options.correlation_token,
            endpoint,
            payload: options.payload,
            context_properties: Vec::new(),
            payload_endpoints: Vec::new(),
        }
    }

    /// Event header name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrite the event header name
    ///
    /// Used when a controller discovers after construction that the actual
    /// response type differs from the default, e.g. `StateReport`.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Append one reported property to the response context
    ///
    /// `timeOfSample` is stamped with the current instant. Properties are
    /// append-only; adding the same property twice yields duplicates.
    pub fn add_context_property(
        &mut self,
        namespace: &str,
        name: &str,
        value: Value,
        uncertainty_ms: u64,
        instance: Option<&str>,
    ) {
        self.context_properties.push(ContextProperty {
            namespace: namespace.to_string(),
            name: name.to_string(),
            value,
            time_of_sample: utc_timestamp(),
            uncertainty_in_milliseconds: uncertainty_ms,
            instance: instance.map(str::to_string),
        });
    }

    /// Properties appended to the context so far
    #[must_use]
    pub fn context_properties(&self) -> &[ContextProperty] {
        &self.context_properties
    }

    /// Insert or overwrite one endpoint cookie entry
    ///
    /// A no-op when the envelope carries no endpoint block or the endpoint
    /// was constructed without a cookie.
    pub fn add_cookie(&mut self, key: &str, value: Value) {
        if let Some(cookie) = self.endpoint.as_mut().and_then(|e| e.cookie.as_mut()) {
            cookie.insert(key.to_string(), value);
        }
    }

    /// Replace the event payload wholesale
    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    /// Append one endpoint descriptor to the discovery payload
    pub fn add_payload_endpoint(&mut self, descriptor: PayloadEndpoint) {
        self.payload_endpoints.push(descriptor);
    }

    /// Replace the discovery payload endpoints wholesale
    pub fn set_payload_endpoints(&mut self, descriptors: Vec<PayloadEndpoint>) {
        self.payload_endpoints = descriptors;
    }

    /// Render the final wire structure
    ///
    /// With `elide_empty_context` set, a context holding no properties is
    /// omitted from the result entirely.
    #[must_use]
    pub fn serialize(&self, elide_empty_context: bool) -> Value {
        let mut header = json!({
            "namespace": self.namespace,
            "name": self.name,
            "messageId": self.message_id,
            "payloadVersion": self.payload_version,
        });
        if let (Some(token), Some(map)) = (&self.correlation_token, header.as_object_mut()) {
            map.insert("correlationToken".to_string(), json!(token));
        }

        let mut payload = self.payload.clone();
        if !self.payload_endpoints.is_empty() {
            if !payload.is_object() {
                payload = Value::Object(Map::new());
            }
            let endpoints: Vec<Value> =
                self.payload_endpoints.iter().map(PayloadEndpoint::to_value).collect();
            if let Some(map) = payload.as_object_mut() {
                map.insert("endpoints".to_string(), Value::Array(endpoints));
            }
        }

        let mut event = json!({
            "header": header,
            "payload": payload,
        });
        if let (Some(endpoint), Some(map)) = (&self.endpoint, event.as_object_mut()) {
            let mut block = json!({
                "scope": {"type": "BearerToken", "token": endpoint.token},
                "endpointId": endpoint.endpoint_id,
            });
            if let (Some(cookie), Some(ep)) = (&endpoint.cookie, block.as_object_mut()) {
                ep.insert("cookie".to_string(), json!(cookie));
            }
            map.insert("endpoint".to_string(), block);
        }

        let mut context = Map::new();
        if !self.context_properties.is_empty() {
            let properties: Vec<Value> =
                self.context_properties.iter().map(ContextProperty::to_value).collect();
            context.insert("properties".to_string(), Value::Array(properties));
        }

        let mut response = Map::new();
        if !(elide_empty_context && context.is_empty()) {
            response.insert("context".to_string(), Value::Object(context));
        }
        response.insert("event".to_string(), event);
        Value::Object(response)
    }
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self::new(EnvelopeOptions::default())
    }
}
