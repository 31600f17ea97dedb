//! OAuth configuration.

use std::time::Duration;

use url::Url;

use crate::error::AuthError;

/// Default loopback redirect URI registered for the Kroger application.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Kroger authorization endpoint.
pub const KROGER_AUTH_URL: &str = "https://api.kroger.com/v1/connect/oauth2/authorize";

/// Kroger token endpoint.
pub const KROGER_TOKEN_URL: &str = "https://api.kroger.com/v1/connect/oauth2/token";

/// Scopes needed to look up products and write to the cart.
pub const KROGER_SCOPES: &[&str] = &["product.compact", "cart.basic:write"];

/// How client credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuthStyle {
    /// HTTP Basic `Authorization` header.
    #[default]
    BasicHeader,
    /// `client_id` and `client_secret` form fields.
    RequestBody,
}

/// Configuration for an OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Loopback redirect URI (e.g., "http://localhost:8080/callback")
    pub redirect_uri: String,
    /// OAuth scopes, in request order
    pub scopes: Vec<String>,
    /// Callback timeout in seconds
    pub callback_timeout_secs: u64,
    /// Upper bound on the token exchange request, in seconds
    pub request_timeout_secs: u64,
    /// How the client authenticates at the token endpoint
    pub auth_style: ClientAuthStyle,
}

impl OAuthConfig {
    /// Create a new OAuth configuration.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: Vec::new(),
            callback_timeout_secs: 120,
            request_timeout_secs: 30,
            auth_style: ClientAuthStyle::default(),
        }
    }

    /// Set OAuth scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Set callback timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.callback_timeout_secs = timeout_secs;
        self
    }

    /// Set the token exchange request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.request_timeout_secs = timeout_secs;
        self
    }

    /// Set how client credentials are sent to the token endpoint.
    #[must_use]
    pub fn with_auth_style(mut self, style: ClientAuthStyle) -> Self {
        self.auth_style = style;
        self
    }

    /// Callback timeout as a [`Duration`].
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    /// Token exchange timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Scopes joined the way the authorization endpoint expects them.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    /// Check that the configuration is usable before any network activity.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::ConfigMissing("client ID".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(AuthError::ConfigMissing("client secret".to_string()));
        }
        for (name, value) in [
            ("authorization URL", &self.auth_url),
            ("token URL", &self.token_url),
        ] {
            Url::parse(value)
                .map_err(|e| AuthError::ConfigMissing(format!("valid {name} ({e})")))?;
        }
        let redirect = Url::parse(&self.redirect_uri)
            .map_err(|e| AuthError::ConfigMissing(format!("valid redirect URI ({e})")))?;
        if redirect.host_str().is_none() {
            return Err(AuthError::ConfigMissing("redirect URI host".to_string()));
        }
        Ok(())
    }
}

/// Kroger OAuth configuration for the given application credentials.
pub fn kroger_oauth_config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
) -> OAuthConfig {
    OAuthConfig::new(client_id, client_secret, KROGER_AUTH_URL, KROGER_TOKEN_URL)
        .with_scopes(KROGER_SCOPES.iter().copied())
        .with_redirect_uri(DEFAULT_REDIRECT_URI)
        .with_timeout(120)
}
