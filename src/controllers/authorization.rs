//! `Alexa.Authorization` grant handling
//!
//! `AcceptGrant` exchanges the delivered grant code for access and refresh
//! tokens and persists them as the user's credential.

use chrono::{Duration, Utc};
use serde_json::Value;

use super::ControllerContext;
use crate::config::OauthConfig;
use crate::response::{EnvelopeOptions, ResponseEnvelope, WIRE_TIMESTAMP_FORMAT};
use crate::stores::UserCredential;
use crate::Error;

/// Accepts authorization grants on behalf of the user
pub struct AuthorizationController {
    ctx: ControllerContext,
}

impl AuthorizationController {
    pub(crate) fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    /// Exchange the grant code and persist the resulting credential
    pub async fn process(self, oauth: &OauthConfig) -> ResponseEnvelope {
        let Some(grant_code) = self.ctx.payload.pointer("/grant/code").and_then(Value::as_str)
        else {
            return self.ctx.error_response("missing grant code");
        };
        let Some(grantee_token) =
            self.ctx.payload.pointer("/grantee/token").and_then(Value::as_str)
        else {
            return self.ctx.error_response("missing grantee token");
        };

        let user_id = match &self.ctx.identity {
            Ok(identity) => identity.user_id.clone(),
            Err(e) => {
                tracing::error!(error = %e, "cannot accept a grant without a resolved user");
                return self
                    .ctx
                    .error_response(Error::IdentityResolution(e.to_string()));
            }
        };

        let grant = match self
            .ctx
            .services
            .exchanger
            .exchange_grant_code(grant_code, oauth)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                tracing::error!(error = %e.error, description = %e.error_description, "grant code exchange failed");
                return self.ctx.error_response(e);
            }
        };

        // Expiry is recorded five seconds short of the token lifetime
        let expiration_utc = (Utc::now() + Duration::seconds(grant.expires_in - 5))
            .format(WIRE_TIMESTAMP_FORMAT)
            .to_string();

        let credential = UserCredential {
            user_id: user_id.clone(),
            grant_code: grant_code.to_string(),
            grantee_token: grantee_token.to_string(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_type: grant.token_type,
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            redirect_uri: oauth.redirect_uri.clone(),
            expiration_utc,
        };

        if let Err(e) = self.ctx.services.credentials.put_user(credential).await {
            tracing::error!(user_id = %user_id, error = %e, "credential write failed");
            return self
                .ctx
                .error_response(Error::Persistence("Error creating User".to_string()));
        }

        tracing::info!(user_id = %user_id, "grant accepted");
        ResponseEnvelope::new(EnvelopeOptions {
            namespace: "Alexa.Authorization".to_string(),
            name: "AcceptGrant.Response".to_string(),
            ..EnvelopeOptions::default()
        })
    }
}
