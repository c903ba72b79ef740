//! Network-backed OAuth and identity collaborators
//!
//! [`OauthClient`] talks to the authorization server's token endpoint;
//! [`JwksIdentityResolver`] validates skill access tokens against the
//! server's published key set and reads the user id from the `sub` claim.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::OauthConfig;
use crate::stores::{
    ExchangeError, IdentityError, IdentityOutcome, IdentityResolver, ResolvedIdentity,
    TokenExchanger, TokenGrant,
};
use crate::Result;

/// How long a fetched JWKS document stays trusted
const JWKS_TTL: Duration = Duration::from_secs(3600);

/// Token-endpoint client for grant-code exchange and refresh
pub struct OauthClient {
    client: reqwest::Client,
    token_url: String,
}

impl OauthClient {
    /// Create a client for one token endpoint
    #[must_use]
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.into(),
        }
    }

    /// Exchange a refresh token for a fresh token grant
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        oauth: &OauthConfig,
    ) -> std::result::Result<TokenGrant, ExchangeError> {
        self.post_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
            ("redirect_uri", &oauth.redirect_uri),
        ])
        .await
    }

    async fn post_token(
        &self,
        form: &[(&str, &str)],
    ) -> std::result::Result<TokenGrant, ExchangeError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(ExchangeError::transport)?;

        let body: Value = response.json().await.map_err(ExchangeError::transport)?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(ExchangeError {
                error: error.to_string(),
                error_description: body
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        serde_json::from_value(body).map_err(|e| ExchangeError {
            error: "invalid_response".to_string(),
            error_description: e.to_string(),
        })
    }
}

#[async_trait]
impl TokenExchanger for OauthClient {
    async fn exchange_grant_code(
        &self,
        code: &str,
        oauth: &OauthConfig,
    ) -> std::result::Result<TokenGrant, ExchangeError> {
        self.post_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
            ("redirect_uri", &oauth.redirect_uri),
        ])
        .await
    }
}

/// Claims carried by the skill access token
#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
}

struct CachedJwks {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

/// JWKS-backed identity resolver
///
/// Decode failures come back as [`IdentityError`] values, never as faults.
pub struct JwksIdentityResolver {
    client: reqwest::Client,
    jwks_url: String,
    keys: RwLock<Option<CachedJwks>>,
}

impl JwksIdentityResolver {
    /// Create a resolver for one JWKS document URL
    #[must_use]
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            keys: RwLock::new(None),
        }
    }

    /// Fetch the key set, reusing a cached copy while it is fresh
    async fn jwks(&self) -> Result<Vec<Jwk>> {
        {
            let cached = self.keys.read().await;
            if let Some(jwks) = cached.as_ref() {
                if jwks.fetched_at.elapsed() < JWKS_TTL {
                    return Ok(jwks.keys.clone());
                }
            }
        }

        let set: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(keys = set.keys.len(), "fetched JWKS document");
        let mut cached = self.keys.write().await;
        *cached = Some(CachedJwks { keys: set.keys.clone(), fetched_at: Instant::now() });
        Ok(set.keys)
    }
}

#[async_trait]
impl IdentityResolver for JwksIdentityResolver {
    async fn resolve(&self, token: &str) -> IdentityOutcome {
        let keys = match self.jwks().await {
            Ok(keys) => keys,
            Err(e) => {
                return Err(IdentityError {
                    error: "jwks_unavailable".to_string(),
                    error_description: e.to_string(),
                });
            }
        };

        let header = decode_header(token).map_err(|e| IdentityError {
            error: "invalid_token".to_string(),
            error_description: e.to_string(),
        })?;

        let mut last_error = None;

        // Try each key until one validates (key rotation support)
        for jwk in &keys {
            let Ok(key) = DecodingKey::from_jwk(jwk) else {
                continue;
            };

            let mut validation = Validation::new(header.alg);
            validation.validate_aud = false;
            validation.required_spec_claims.remove("aud");

            match decode::<AccessClaims>(token, &key, &validation) {
                Ok(data) => return Ok(ResolvedIdentity { user_id: data.claims.sub }),
                Err(e) => last_error = Some(e),
            }
        }

        Err(IdentityError {
            error: "invalid_token".to_string(),
            error_description: last_error.map_or_else(
                || "no JWKS key validated the token".to_string(),
                |e| e.to_string(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_take_the_oauth_shape() {
        let error = ExchangeError::transport("connection refused");
        assert_eq!(error.error, "request_failed");
        assert_eq!(error.error_description, "connection refused");
        assert_eq!(error.to_string(), "request_failed: connection refused");
    }

    #[tokio::test]
    async fn malformed_access_token_is_an_identity_error() {
        let resolver = JwksIdentityResolver::new("http://127.0.0.1:0/jwks.json");
        let outcome = resolver.resolve("not-a-jwt").await;
        assert!(outcome.is_err());
    }
}
