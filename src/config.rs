//! Configuration for the Hearth gateway

/// OAuth client parameters forwarded to the authorization controller
#[derive(Debug, Clone, Default)]
pub struct OauthConfig {
    /// Client id issued by the authorization server
    pub client_id: String,

    /// Client secret issued by the authorization server
    pub client_secret: String,

    /// Redirect URI registered for the client
    pub redirect_uri: String,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// OAuth client used for grant-code exchange
    pub oauth: OauthConfig,

    /// Authorization-server token endpoint
    pub token_url: String,

    /// JWKS document URL for access-token validation; `None` disables
    /// network-backed identity resolution
    pub jwks_url: Option<String>,
}

/// Default token endpoint of the voice-assistant authorization server
const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `HEARTH_CLIENT_ID`, `HEARTH_CLIENT_SECRET`,
    /// `HEARTH_REDIRECT_URI`, `HEARTH_TOKEN_URL` (default: the assistant
    /// authorization server) and `HEARTH_JWKS_URL` (default: unset).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            oauth: OauthConfig {
                client_id: std::env::var("HEARTH_CLIENT_ID").unwrap_or_default(),
                client_secret: std::env::var("HEARTH_CLIENT_SECRET").unwrap_or_default(),
                redirect_uri: std::env::var("HEARTH_REDIRECT_URI").unwrap_or_default(),
            },
            token_url: std::env::var("HEARTH_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            jwks_url: std::env::var("HEARTH_JWKS_URL").ok(),
        }
    }
}
