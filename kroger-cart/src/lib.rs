//! # kroger-cart
//!
//! Add preset grocery items to a Kroger cart from the terminal.
//!
//! The first run opens the browser for the Kroger OAuth2 login and caches
//! the access token; later runs reuse it until it expires.
//!
//! ## Architecture
//!
//! - [`auth`] (`kroger-cart-auth`): the login flow, token cache, loopback
//!   callback listener and browser launcher
//! - [`client`] (`kroger-cart-client`): config and presets files and the
//!   cart API call
//! - [`cli`]: the `kroger-cart` command line

pub mod cli;

pub use kroger_cart_auth as auth;
pub use kroger_cart_client as client;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::auth::{
        AuthError, AuthSession, Authenticator, CancellationToken, Credential, OAuthConfig,
        TokenStore,
    };
    pub use crate::client::{CartClient, CartError, ClientConfig, Presets};
}
