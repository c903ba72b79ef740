//! Directive routing integration tests
//!
//! Drives the router end to end over memory-backed collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use tokio_test::assert_ok;
use serde_json::{json, Value};

use hearth_gateway::stores::{CredentialStore, DeviceStateStore, UserCredential};
use hearth_gateway::{Error, Result};

mod common;
use common::{
    accept_grant_body, default_services, directive_body, discovery_body, endpoint_with,
    power_capability, range_capability, router, toggle_capability, TEST_GRANT_CODE, TEST_TOKEN,
    TEST_USER,
};

/// State store that rejects every read and write
struct FailingStateStore;

#[async_trait]
impl DeviceStateStore for FailingStateStore {
    async fn property_value(
        &self,
        _endpoint_id: &str,
        _property_name: &str,
        _instance: Option<&str>,
        _sku: &str,
    ) -> Result<Option<Value>> {
        Err(Error::Actuation("shadow offline".to_string()))
    }

    async fn apply_desired(
        &self,
        _endpoint_id: &str,
        _property_name: &str,
        _instance: Option<&str>,
        _value: Value,
    ) -> Result<Value> {
        Err(Error::Actuation("shadow offline".to_string()))
    }
}

/// Credential store that rejects every write
struct FailingCredentialStore;

#[async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn put_user(&self, _credential: UserCredential) -> Result<()> {
        Err(Error::Persistence("table unavailable".to_string()))
    }
}

fn error_name(response: &Value) -> &str {
    response["event"]["header"]["name"].as_str().unwrap()
}

#[tokio::test]
async fn empty_body_yields_error() {
    let fixture = default_services(vec![]).await;
    let response = router(fixture.services).route("").await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(response["event"]["payload"]["type"], "INTERNAL_ERROR");
    assert_eq!(response["event"]["payload"]["message"], "Empty Body");
}

#[tokio::test]
async fn unmatched_namespace_yields_unhandled_error() {
    let fixture = default_services(vec![]).await;
    let body = directive_body("Alexa.SceneController", "Activate", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(
        response["event"]["payload"]["message"],
        "Empty Response: No response processed. Unhandled Directive."
    );
}

#[tokio::test]
async fn malformed_body_degrades_to_unhandled_error() {
    let fixture = default_services(vec![]).await;
    let response = router(fixture.services).route("{not json").await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(
        response["event"]["payload"]["message"],
        "Empty Response: No response processed. Unhandled Directive."
    );
}

#[tokio::test]
async fn power_turn_on_reports_applied_state() {
    let fixture =
        default_services(vec![endpoint_with("E1", TEST_USER, &[power_capability()])]).await;
    let body = directive_body("Alexa.PowerController", "TurnOn", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["event"]["header"]["name"], "Response");
    assert_eq!(response["event"]["header"]["correlationToken"], "corr-1");
    assert_eq!(response["event"]["endpoint"]["endpointId"], "E1");
    assert_eq!(response["event"]["endpoint"]["scope"]["token"], TEST_TOKEN);

    let properties = response["context"]["properties"].as_array().unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0]["namespace"], "Alexa.PowerController");
    assert_eq!(properties[0]["name"], "powerState");
    assert_eq!(properties[0]["value"], "ON");

    let stored = fixture.state.property_value("E1", "powerState", None, "OT00").await.unwrap();
    assert_eq!(stored, Some(json!("ON")));
}

#[tokio::test]
async fn power_turn_off_reports_off() {
    let fixture =
        default_services(vec![endpoint_with("E1", TEST_USER, &[power_capability()])]).await;
    let body = directive_body("Alexa.PowerController", "TurnOff", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["context"]["properties"][0]["value"], "OFF");
}

#[tokio::test]
async fn power_actuation_failure_becomes_error_response() {
    let mut fixture =
        default_services(vec![endpoint_with("E1", TEST_USER, &[power_capability()])]).await;
    fixture.services.state = Arc::new(FailingStateStore);
    let body = directive_body("Alexa.PowerController", "TurnOn", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    let description = response["event"]["payload"]["message"]["error_description"]
        .as_str()
        .unwrap();
    assert!(description.contains("shadow offline"));
}

#[tokio::test]
async fn toggle_scopes_property_by_instance() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[toggle_capability("Light.Strip")],
    )])
    .await;
    let body = directive_body(
        "Alexa.ToggleController",
        "TurnOff",
        "E1",
        Some("Light.Strip"),
        json!({}),
    );
    let response = router(fixture.services).route(&body).await;

    let property = &response["context"]["properties"][0];
    assert_eq!(property["namespace"], "Alexa.ToggleController");
    assert_eq!(property["name"], "toggleState");
    assert_eq!(property["value"], "OFF");
    assert_eq!(property["instance"], "Light.Strip");

    let stored = fixture
        .state
        .property_value("E1", "toggleState", Some("Light.Strip"), "OT00")
        .await
        .unwrap();
    assert_eq!(stored, Some(json!("OFF")));
}

#[tokio::test]
async fn set_range_value_within_bounds() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[range_capability("Fan.Speed", 1, 10, 1)],
    )])
    .await;
    let body = directive_body(
        "Alexa.RangeController",
        "SetRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValue": 7}),
    );
    let response = router(fixture.services).route(&body).await;

    let property = &response["context"]["properties"][0];
    assert_eq!(property["name"], "rangeValue");
    assert_eq!(property["value"], 7);
    assert_eq!(property["instance"], "Fan.Speed");

    let stored = fixture
        .state
        .property_value("E1", "rangeValue", Some("Fan.Speed"), "OT00")
        .await
        .unwrap();
    assert_eq!(stored, Some(json!(7)));
}

#[tokio::test]
async fn set_range_value_clamps_to_bounds() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[range_capability("Fan.Speed", 1, 10, 1)],
    )])
    .await;

    let over = directive_body(
        "Alexa.RangeController",
        "SetRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValue": 15}),
    );
    let response = router(fixture.services.clone()).route(&over).await;
    assert_eq!(response["context"]["properties"][0]["value"], 10);

    let under = directive_body(
        "Alexa.RangeController",
        "SetRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValue": -4}),
    );
    let response = router(fixture.services).route(&under).await;
    assert_eq!(response["context"]["properties"][0]["value"], 1);
}

#[tokio::test]
async fn adjust_range_value_applies_delta_to_current() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[range_capability("Fan.Speed", 1, 10, 1)],
    )])
    .await;
    fixture.state.set("E1", "rangeValue", Some("Fan.Speed"), json!(5)).await;

    let body = directive_body(
        "Alexa.RangeController",
        "AdjustRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValueDelta": 2, "rangeValueDeltaDefault": false}),
    );
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["context"]["properties"][0]["value"], 7);
}

#[tokio::test]
async fn adjust_range_value_round_trips_without_clamping() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[range_capability("Fan.Speed", 1, 10, 1)],
    )])
    .await;
    fixture.state.set("E1", "rangeValue", Some("Fan.Speed"), json!(5)).await;

    let up = directive_body(
        "Alexa.RangeController",
        "AdjustRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValueDelta": 3, "rangeValueDeltaDefault": false}),
    );
    router(fixture.services.clone()).route(&up).await;

    let down = directive_body(
        "Alexa.RangeController",
        "AdjustRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValueDelta": -3, "rangeValueDeltaDefault": false}),
    );
    router(fixture.services.clone()).route(&down).await;

    let stored = fixture
        .state
        .property_value("E1", "rangeValue", Some("Fan.Speed"), "OT00")
        .await
        .unwrap();
    assert_eq!(stored, Some(json!(5)));
}

#[tokio::test]
async fn adjust_range_value_default_delta_moves_by_precision() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[range_capability("Fan.Speed", 1, 10, 2)],
    )])
    .await;
    fixture.state.set("E1", "rangeValue", Some("Fan.Speed"), json!(4)).await;

    let body = directive_body(
        "Alexa.RangeController",
        "AdjustRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValueDelta": 99, "rangeValueDeltaDefault": true}),
    );
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["context"]["properties"][0]["value"], 6);
}

#[tokio::test]
async fn range_persistence_failure_discards_context_property() {
    let mut fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[range_capability("Fan.Speed", 1, 10, 1)],
    )])
    .await;
    fixture.services.state = Arc::new(FailingStateStore);

    let body = directive_body(
        "Alexa.RangeController",
        "SetRangeValue",
        "E1",
        Some("Fan.Speed"),
        json!({"rangeValue": 7}),
    );
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert!(response.get("context").is_none());
}

#[tokio::test]
async fn report_state_returns_state_report() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[power_capability(), toggle_capability("Light.Strip")],
    )])
    .await;
    fixture.state.set("E1", "powerState", None, json!("ON")).await;
    fixture.state.set("E1", "toggleState", Some("Light.Strip"), json!("OFF")).await;

    let body = directive_body("Alexa", "ReportState", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["event"]["header"]["name"], "StateReport");
    let properties = response["context"]["properties"].as_array().unwrap();
    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0]["namespace"], "Alexa.PowerController");
    assert_eq!(properties[0]["value"], "ON");
    assert_eq!(properties[1]["instance"], "Light.Strip");
}

#[tokio::test]
async fn report_state_skips_unresolved_properties() {
    let fixture = default_services(vec![endpoint_with(
        "E1",
        TEST_USER,
        &[power_capability(), toggle_capability("Light.Strip")],
    )])
    .await;
    fixture.state.set("E1", "powerState", None, json!("ON")).await;

    let body = directive_body("Alexa", "ReportState", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    let properties = response["context"]["properties"].as_array().unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0]["name"], "powerState");
}

#[tokio::test]
async fn report_state_without_resolved_values_is_an_error() {
    let fixture =
        default_services(vec![endpoint_with("E1", TEST_USER, &[power_capability()])]).await;

    let body = directive_body("Alexa", "ReportState", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(
        response["event"]["payload"]["message"]["error_description"],
        "Cannot get device state"
    );
}

#[tokio::test]
async fn report_state_without_retrievable_capabilities_is_an_error() {
    let silent = hearth_gateway::Capability::new("Alexa.PowerController")
        .with_supported(&["powerState"], true, false);
    let fixture = default_services(vec![endpoint_with("E1", TEST_USER, &[silent])]).await;
    fixture.state.set("E1", "powerState", None, json!("ON")).await;

    let body = directive_body("Alexa", "ReportState", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(
        response["event"]["payload"]["message"]["error_description"],
        "Cannot get device state"
    );
}

#[tokio::test]
async fn report_state_rejects_other_names() {
    let fixture =
        default_services(vec![endpoint_with("E1", TEST_USER, &[power_capability()])]).await;

    let body = directive_body("Alexa", "Ping", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(
        response["event"]["payload"]["message"]["error_description"],
        "Name not supported Ping"
    );
}

#[tokio::test]
async fn discovery_with_sentinel_token_lists_development_endpoints() {
    let fixture = default_services(vec![
        endpoint_with("E1", "0", &[power_capability()]),
        endpoint_with("E2", "0", &[toggle_capability("Light.Strip")]),
        endpoint_with("E3", "someone-else", &[power_capability()]),
    ])
    .await;

    let body = discovery_body("access-token-from-skill");
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["event"]["header"]["namespace"], "Alexa.Discovery");
    assert_eq!(response["event"]["header"]["name"], "Discover.Response");
    assert!(response["event"].get("endpoint").is_none());

    let endpoints = response["event"]["payload"]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[0]["endpointId"], "E1");
    assert_eq!(endpoints[1]["endpointId"], "E2");
    assert_eq!(
        endpoints[0]["capabilities"][0]["interface"],
        "Alexa.PowerController"
    );
    assert!(endpoints[0]["friendlyName"].as_str().unwrap().contains("Sample Endpoint"));
    assert_eq!(endpoints[0]["displayCategories"][0], "OTHER");
    assert_eq!(endpoints[0]["manufacturerName"], "Sample Manufacturer");
}

#[tokio::test]
async fn discovery_resolves_real_tokens() {
    let fixture = default_services(vec![
        endpoint_with("E1", TEST_USER, &[power_capability()]),
        endpoint_with("E2", "0", &[power_capability()]),
    ])
    .await;

    let body = discovery_body(TEST_TOKEN);
    let response = router(fixture.services).route(&body).await;

    let endpoints = response["event"]["payload"]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0]["endpointId"], "E1");
}

#[tokio::test]
async fn discovery_identity_failure_is_an_error() {
    let fixture = default_services(vec![]).await;
    let body = discovery_body("unknown-token");
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(response["event"]["payload"]["type"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn accept_grant_persists_credential() {
    let fixture = default_services(vec![]).await;
    let body = accept_grant_body(TEST_GRANT_CODE, TEST_TOKEN);
    let before = Utc::now();
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["event"]["header"]["namespace"], "Alexa.Authorization");
    assert_eq!(response["event"]["header"]["name"], "AcceptGrant.Response");
    assert!(response["event"].get("endpoint").is_none());
    assert!(response.get("context").is_none());

    let credential = fixture.credentials.user(TEST_USER).await.unwrap();
    assert_eq!(credential.grant_code, TEST_GRANT_CODE);
    assert_eq!(credential.grantee_token, TEST_TOKEN);
    assert_eq!(credential.access_token, "access-1");
    assert_eq!(credential.refresh_token, "refresh-1");
    assert_eq!(credential.token_type, "Bearer");
    assert_eq!(credential.client_id, "client-1");

    let parsed = assert_ok!(NaiveDateTime::parse_from_str(
        &credential.expiration_utc,
        "%Y-%m-%dT%H:%M:%S.00Z"
    ));
    let expiry = Utc.from_utc_datetime(&parsed);
    let expected = before + chrono::Duration::seconds(9000 - 5);
    let drift = (expiry - expected).num_seconds().abs();
    assert!(drift <= 5, "expiry drifted by {drift}s");
}

#[tokio::test]
async fn accept_grant_with_unresolved_identity_is_an_error() {
    let fixture = default_services(vec![]).await;
    let body = accept_grant_body(TEST_GRANT_CODE, "unknown-token");
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    let description = response["event"]["payload"]["message"]["error_description"]
        .as_str()
        .unwrap();
    assert!(description.contains("invalid_token"));
}

#[tokio::test]
async fn accept_grant_exchange_failure_is_an_error() {
    let fixture = default_services(vec![]).await;
    let body = accept_grant_body("bogus-code", TEST_TOKEN);
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    let description = response["event"]["payload"]["message"]["error_description"]
        .as_str()
        .unwrap();
    assert!(description.contains("invalid_grant"));
}

#[tokio::test]
async fn accept_grant_credential_write_failure_is_an_error() {
    let mut fixture = default_services(vec![]).await;
    fixture.services.credentials = Arc::new(FailingCredentialStore);
    let body = accept_grant_body(TEST_GRANT_CODE, TEST_TOKEN);
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(
        response["event"]["payload"]["message"]["error_description"],
        "Error creating User"
    );
}

#[tokio::test]
async fn mode_controller_is_not_implemented() {
    let fixture = default_services(vec![]).await;
    let body = directive_body("Alexa.ModeController", "SetMode", "E1", Some("Fan.Mode"), json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    assert_eq!(response["event"]["payload"]["type"], "INTERNAL_ERROR");
    assert_eq!(response["event"]["payload"]["message"], "Not Yet Implemented");
}

#[tokio::test]
async fn cooking_set_mode_is_acknowledged() {
    let fixture = default_services(vec![]).await;
    let body = directive_body(
        "Alexa.Cooking",
        "SetCookingMode",
        "E1",
        None,
        json!({"cookingMode": "TIMECOOK"}),
    );
    let response = router(fixture.services).route(&body).await;

    assert_eq!(response["event"]["header"]["name"], "Response");
    assert_eq!(response["event"]["endpoint"]["endpointId"], "E1");
    assert!(response.get("context").is_none());
}

#[tokio::test]
async fn cooking_rejects_other_names() {
    let fixture = default_services(vec![]).await;
    let body = directive_body("Alexa.Cooking", "StartTimer", "E1", None, json!({}));
    let response = router(fixture.services).route(&body).await;

    assert_eq!(
        response["event"]["payload"]["message"]["error_description"],
        "Name not supported StartTimer"
    );
}

#[tokio::test]
async fn range_directive_for_unknown_endpoint_is_an_error() {
    let fixture = default_services(vec![]).await;
    let body = directive_body(
        "Alexa.RangeController",
        "SetRangeValue",
        "E404",
        Some("Fan.Speed"),
        json!({"rangeValue": 3}),
    );
    let response = router(fixture.services).route(&body).await;

    assert_eq!(error_name(&response), "ErrorResponse");
    let description = response["event"]["payload"]["message"]["error_description"]
        .as_str()
        .unwrap();
    assert!(description.contains("E404"));
}
