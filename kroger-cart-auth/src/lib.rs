//! OAuth2 authorization-code login for desktop tools.
//!
//! This crate drives the browser-based login against an OAuth2 provider and
//! caches the resulting credential on disk:
//!
//! - [`OAuthConfig`]: Client credentials, endpoints, scopes and redirect URI
//! - [`TokenStore`]: Loads and atomically saves the single cached [`Credential`]
//! - [`CallbackListener`]: Single-session loopback endpoint that captures the code
//! - [`BrowserLauncher`]: Best-effort "open this URL" strategy for the host OS
//! - [`Authenticator`]: Ties the pieces together with a deadline and cancellation
//!
//! ## Example
//!
//! ```rust,ignore
//! use kroger_cart_auth::{kroger_oauth_config, Authenticator, TokenStore};
//!
//! let config = kroger_oauth_config(client_id, client_secret);
//! let auth = Authenticator::new(config, TokenStore::new("token.json"));
//!
//! // Returns the cached token if it is still valid, otherwise opens the browser.
//! let session = auth.authenticate().await?;
//! println!("token expires at {}", session.credential.expiry);
//! ```

pub mod browser;
pub mod callback;
pub mod config;
mod credential;
mod error;
mod flow;
mod state;
mod store;

pub use browser::{system_launcher, BoxedLauncher, BrowserLauncher, SystemLauncher};
pub use callback::{CallbackHandle, CallbackListener, CallbackOutcome};
pub use config::{kroger_oauth_config, ClientAuthStyle, OAuthConfig};
pub use credential::{Credential, TokenResponse};
pub use error::{AuthError, ExchangeError, LaunchError, PersistError, TokenLoadError};
pub use flow::{build_authorization_url, exchange_code, AuthSession, Authenticator};
pub use state::AuthorizationState;
pub use store::{TokenStore, DEFAULT_TOKEN_FILE};

/// Re-exported so callers can cancel [`Authenticator::authenticate_with`].
pub use tokio_util::sync::CancellationToken;
