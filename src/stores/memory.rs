//! In-memory collaborator implementations
//!
//! Back the dev harness and the integration tests. Shadow values are keyed
//! the way the device shadow stores them: `instance.property` for instanced
//! controllers, the bare property name otherwise.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    CredentialStore, DeviceStateStore, EndpointRegistry, ExchangeError, IdentityError,
    IdentityOutcome, IdentityResolver, ResolvedIdentity, TokenExchanger, TokenGrant,
    UserCredential,
};
use crate::config::OauthConfig;
use crate::endpoint::EndpointRecord;
use crate::Result;

fn shadow_key(endpoint_id: &str, property_name: &str, instance: Option<&str>) -> String {
    match instance.filter(|i| !i.is_empty()) {
        Some(instance) => format!("{endpoint_id}/{instance}.{property_name}"),
        None => format!("{endpoint_id}/{property_name}"),
    }
}

/// Endpoint registry held in process memory
#[derive(Default)]
pub struct MemoryRegistry {
    records: RwLock<HashMap<String, EndpointRecord>>,
}

impl MemoryRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EndpointRegistry for MemoryRegistry {
    async fn endpoint(&self, endpoint_id: &str) -> Result<Option<EndpointRecord>> {
        Ok(self.records.read().await.get(endpoint_id).cloned())
    }

    async fn list_endpoints(&self, user_id: &str) -> Result<Vec<String>> {
        let records = self.records.read().await;
        let mut ids: Vec<String> = records
            .values()
            .filter(|record| record.user_id == user_id)
            .map(|record| record.endpoint_id.clone())
            .collect();
        // Stable listing order for callers and tests
        ids.sort();
        Ok(ids)
    }

    async fn upsert_endpoint(&self, record: EndpointRecord) -> Result<()> {
        self.records.write().await.insert(record.endpoint_id.clone(), record);
        Ok(())
    }

    async fn delete_endpoint(&self, endpoint_id: &str) -> Result<()> {
        self.records.write().await.remove(endpoint_id);
        Ok(())
    }
}

/// Device shadow state held in process memory
#[derive(Default)]
pub struct MemoryStateStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    /// Create an empty state store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload one shadow value
    pub async fn set(
        &self,
        endpoint_id: &str,
        property_name: &str,
        instance: Option<&str>,
        value: Value,
    ) {
        self.values
            .write()
            .await
            .insert(shadow_key(endpoint_id, property_name, instance), value);
    }
}

#[async_trait]
impl DeviceStateStore for MemoryStateStore {
    async fn property_value(
        &self,
        endpoint_id: &str,
        property_name: &str,
        instance: Option<&str>,
        _sku: &str,
    ) -> Result<Option<Value>> {
        let key = shadow_key(endpoint_id, property_name, instance);
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn apply_desired(
        &self,
        endpoint_id: &str,
        property_name: &str,
        instance: Option<&str>,
        value: Value,
    ) -> Result<Value> {
        let key = shadow_key(endpoint_id, property_name, instance);
        tracing::debug!(key = %key, value = %value, "applying desired state");
        self.values.write().await.insert(key, value.clone());
        Ok(value)
    }
}

/// Credential store held in process memory
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, UserCredential>>,
}

impl MemoryCredentialStore {
    /// Create an empty credential store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the stored credential for a user
    pub async fn user(&self, user_id: &str) -> Option<UserCredential> {
        self.users.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn put_user(&self, credential: UserCredential) -> Result<()> {
        tracing::debug!(user_id = %credential.user_id, "storing user credential");
        self.users.write().await.insert(credential.user_id.clone(), credential);
        Ok(())
    }
}

/// Identity resolver over a fixed token table
#[derive(Default)]
pub struct StaticIdentityResolver {
    users: HashMap<String, String>,
}

impl StaticIdentityResolver {
    /// Create a resolver that rejects every token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `user_id`
    #[must_use]
    pub fn with_token(mut self, token: &str, user_id: &str) -> Self {
        self.users.insert(token.to_string(), user_id.to_string());
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> IdentityOutcome {
        self.users.get(token).map_or_else(
            || {
                Err(IdentityError {
                    error: "invalid_token".to_string(),
                    error_description: "unknown access token".to_string(),
                })
            },
            |user_id| Ok(ResolvedIdentity { user_id: user_id.clone() }),
        )
    }
}

/// Token exchanger over a fixed grant table
#[derive(Default)]
pub struct StaticTokenExchanger {
    grants: HashMap<String, TokenGrant>,
}

impl StaticTokenExchanger {
    /// Create an exchanger that rejects every grant code
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `code` and answer with `grant`
    #[must_use]
    pub fn with_grant(mut self, code: &str, grant: TokenGrant) -> Self {
        self.grants.insert(code.to_string(), grant);
        self
    }
}

#[async_trait]
impl TokenExchanger for StaticTokenExchanger {
    async fn exchange_grant_code(
        &self,
        code: &str,
        _oauth: &OauthConfig,
    ) -> std::result::Result<TokenGrant, ExchangeError> {
        self.grants.get(code).cloned().ok_or_else(|| ExchangeError {
            error: "invalid_grant".to_string(),
            error_description: format!("unknown grant code {code}"),
        })
    }
}
