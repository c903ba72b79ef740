//! Endpoint and capability models
//!
//! An endpoint is a virtual device with a stable identifier and a set of
//! declared capabilities. The registry stores capability declarations in
//! their serialized JSON form; they are parsed on demand.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// A virtual device record as stored by the endpoint registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    /// Stable endpoint identifier
    pub endpoint_id: String,

    /// Name the user refers to the endpoint by
    pub friendly_name: String,

    /// Human-readable description
    pub description: String,

    /// Endpoint manufacturer
    pub manufacturer_name: String,

    /// Display categories for companion-app grouping
    pub display_categories: Vec<String>,

    /// Endpoint product type code (e.g. `SW01`)
    pub sku: String,

    /// Owning user id
    pub user_id: String,

    /// Capability declarations in their stored serialized form
    pub capabilities: String,
}

impl EndpointRecord {
    /// A sample record with generated id and name, useful for seeding
    #[must_use]
    pub fn sample() -> Self {
        Self {
            endpoint_id: sample_endpoint_id(),
            friendly_name: format!("{} Sample Endpoint", random_color()),
            description: "Sample Description".to_string(),
            manufacturer_name: "Sample Manufacturer".to_string(),
            display_categories: vec!["OTHER".to_string()],
            sku: "OT00".to_string(),
            user_id: "0".to_string(),
            capabilities: "[]".to_string(),
        }
    }

    /// Parse the stored capability declarations
    ///
    /// # Errors
    ///
    /// Returns error when the stored form is not a valid capability list
    pub fn parsed_capabilities(&self) -> Result<Vec<Capability>> {
        Ok(serde_json::from_str(&self.capabilities)?)
    }

    /// Stored capability declarations as a raw JSON value
    ///
    /// # Errors
    ///
    /// Returns error when the stored form is not valid JSON
    pub fn capabilities_value(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.capabilities)?)
    }
}

/// A declared capability interface of an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Declaration type, `AlexaInterface` on this protocol version
    #[serde(rename = "type")]
    pub capability_type: String,

    /// Interface namespace (e.g. `Alexa.RangeController`)
    pub interface: String,

    /// Interface version
    pub version: String,

    /// Discriminator when one endpoint carries several controllers of the
    /// same interface type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Reportable properties of the interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<CapabilityProperties>,

    /// Interface-specific configuration (carries `supportedRange` for
    /// range controllers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,

    /// Friendly-name resources for instanced controllers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_resources: Option<Value>,
}

/// Property declarations of one capability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProperties {
    /// Properties the interface reports
    #[serde(default)]
    pub supported: Vec<SupportedProperty>,

    /// Whether changes are reported without being asked
    #[serde(default)]
    pub proactively_reported: bool,

    /// Whether the property can be queried through `ReportState`
    #[serde(default)]
    pub retrievable: bool,
}

/// One reportable property name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedProperty {
    /// Property name within the interface
    pub name: String,
}

/// Value bounds of a range controller instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportedRange {
    /// Smallest accepted value
    pub minimum: f64,
    /// Largest accepted value
    pub maximum: f64,
    /// Step the value moves by when no magnitude is given
    pub precision: f64,
}

impl SupportedRange {
    /// Clamp a requested value into the declared bounds
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.min(self.maximum).max(self.minimum)
    }
}

impl Capability {
    /// Start a declaration for an interface, protocol defaults filled in
    #[must_use]
    pub fn new(interface: &str) -> Self {
        Self {
            capability_type: "AlexaInterface".to_string(),
            interface: interface.to_string(),
            version: "3".to_string(),
            instance: None,
            properties: None,
            configuration: None,
            capability_resources: None,
        }
    }

    /// Scope the capability to a controller instance
    #[must_use]
    pub fn with_instance(mut self, instance: &str) -> Self {
        self.instance = Some(instance.to_string());
        self
    }

    /// Declare the reportable properties
    #[must_use]
    pub fn with_supported(
        mut self,
        names: &[&str],
        proactively_reported: bool,
        retrievable: bool,
    ) -> Self {
        self.properties = Some(CapabilityProperties {
            supported: names
                .iter()
                .map(|name| SupportedProperty { name: (*name).to_string() })
                .collect(),
            proactively_reported,
            retrievable,
        });
        self
    }

    /// Attach interface-specific configuration
    #[must_use]
    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Whether the capability can be queried through `ReportState`
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| p.retrievable)
    }

    /// The declared `supportedRange` bounds, when present
    #[must_use]
    pub fn supported_range(&self) -> Option<SupportedRange> {
        let range = self.configuration.as_ref()?.get("supportedRange")?;
        Some(SupportedRange {
            minimum: range.get("minimumValue")?.as_f64()?,
            maximum: range.get("maximumValue")?.as_f64()?,
            precision: range.get("precision")?.as_f64()?,
        })
    }
}

/// Generated id for endpoint descriptors built without one
#[must_use]
pub fn generated_endpoint_id() -> String {
    format!("endpoint_{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Generated id in the sample-endpoint scheme
#[must_use]
pub fn sample_endpoint_id() -> String {
    let code: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("SAMPLE_ENDPOINT_{code}")
}

const SAMPLE_COLORS: [&str; 6] = ["Amber", "Cobalt", "Crimson", "Ivory", "Sage", "Teal"];

fn random_color() -> &'static str {
    SAMPLE_COLORS[rand::thread_rng().gen_range(0..SAMPLE_COLORS.len())]
}
