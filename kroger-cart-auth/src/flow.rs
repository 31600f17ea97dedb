//! Authorization-code flow execution.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{system_launcher, BoxedLauncher};
use crate::callback::CallbackListener;
use crate::config::{ClientAuthStyle, OAuthConfig};
use crate::credential::{Credential, TokenResponse};
use crate::error::{AuthError, ExchangeError};
use crate::state::AuthorizationState;
use crate::store::TokenStore;

/// Result of a successful [`Authenticator::authenticate`].
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Usable credential, either from the cache or freshly exchanged.
    pub credential: Credential,
    /// The configuration the credential was obtained with.
    pub config: OAuthConfig,
}

/// Drives the browser login and keeps the token cache current.
///
/// A valid cached credential short-circuits everything: no listener is
/// bound, no browser is opened and no HTTP request is made.
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: OAuthConfig,
    store: TokenStore,
    launcher: BoxedLauncher,
    client: Client,
}

impl Authenticator {
    /// Create an authenticator using the platform browser launcher.
    pub fn new(config: OAuthConfig, store: TokenStore) -> Self {
        Self {
            config,
            store,
            launcher: system_launcher(),
            client: Client::new(),
        }
    }

    /// Use a different browser launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: BoxedLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Use a custom HTTP client for the token exchange.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Get the OAuth configuration.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Get the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Authenticate with the configured callback timeout and no external
    /// cancellation.
    pub async fn authenticate(&self) -> Result<AuthSession, AuthError> {
        self.authenticate_with(self.config.callback_timeout(), &CancellationToken::new())
            .await
    }

    /// Return a cached credential if it is still valid, otherwise run the
    /// interactive login.
    ///
    /// `deadline` bounds the wait for the browser callback. Cancelling
    /// `cancel` aborts the wait and shuts the listener down. Failing to save
    /// the new credential is logged and does not fail the call.
    pub async fn authenticate_with(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<AuthSession, AuthError> {
        self.config.validate()?;

        if let Some(credential) = self.cached_credential() {
            info!("Access token loaded from {}", self.store.path().display());
            return Ok(self.session(credential));
        }

        let credential = self.run_interactive(deadline, cancel).await?;

        if let Err(e) = self.store.save(&credential) {
            warn!("Failed to save token: {}", e);
        }

        Ok(self.session(credential))
    }

    fn session(&self, credential: Credential) -> AuthSession {
        AuthSession {
            credential,
            config: self.config.clone(),
        }
    }

    fn cached_credential(&self) -> Option<Credential> {
        match self.store.load() {
            Ok(credential) if TokenStore::is_valid(&credential, Utc::now()) => Some(credential),
            Ok(credential) => {
                debug!(expiry = %credential.expiry, "Cached token is stale");
                None
            }
            Err(e) => {
                debug!("No usable cached token: {}", e);
                None
            }
        }
    }

    async fn run_interactive(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Credential, AuthError> {
        let state = AuthorizationState::generate()?;
        let mut handle =
            CallbackListener::start(&self.config.redirect_uri, state.clone(), cancel.child_token())
                .await?;
        let redirect_uri = handle.redirect_uri().to_string();

        let auth_url = match build_authorization_url(&self.config, &redirect_uri, &state) {
            Ok(url) => url,
            Err(e) => {
                handle.close().await;
                return Err(e);
            }
        };

        info!("Opening browser for authentication");
        if let Err(e) = self.launcher.open(&auth_url) {
            warn!(url = %auth_url, "Could not open browser: {}", e);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            _ = tokio::time::sleep(deadline) => Err(AuthError::Timeout(deadline)),
            outcome = handle.recv() => outcome,
        };
        handle.close().await;

        let code = outcome?.into_code()?;
        debug!("Authorization code received, exchanging for token");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            exchanged = exchange_code(&self.client, &self.config, &redirect_uri, &code) => {
                Ok(exchanged?)
            }
        }
    }
}

/// Build the authorization URL for one attempt.
pub fn build_authorization_url(
    config: &OAuthConfig,
    redirect_uri: &str,
    state: &AuthorizationState,
) -> Result<String, AuthError> {
    let url = Url::parse_with_params(
        &config.auth_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", config.scope_param().as_str()),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| AuthError::ConfigMissing(format!("valid authorization URL ({e})")))?;
    Ok(url.into())
}

/// Exchange an authorization code for a credential. No retry.
pub async fn exchange_code(
    client: &Client,
    config: &OAuthConfig,
    redirect_uri: &str,
    code: &str,
) -> Result<Credential, ExchangeError> {
    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];

    let mut request = client
        .post(&config.token_url)
        .header(ACCEPT, "application/json")
        .timeout(config.request_timeout());

    match config.auth_style {
        ClientAuthStyle::BasicHeader => {
            request = request.basic_auth(&config.client_id, Some(&config.client_secret));
        }
        ClientAuthStyle::RequestBody => {
            params.push(("client_id", config.client_id.as_str()));
            params.push(("client_secret", config.client_secret.as_str()));
        }
    }

    let issued_at = Utc::now();
    let response = request.form(&params).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ExchangeError::Status { status, body });
    }

    let tokens: TokenResponse = response.json().await?;
    if tokens.access_token.is_empty() {
        return Err(ExchangeError::InvalidResponse(
            "empty access_token".to_string(),
        ));
    }
    debug!(
        scope = tokens.scope.as_deref().unwrap_or_default(),
        expires_in = ?tokens.expires_in,
        "Token issued"
    );

    Ok(Credential::from_response(tokens, issued_at))
}
