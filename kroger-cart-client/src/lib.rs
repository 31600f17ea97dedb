//! Kroger cart client.
//!
//! The pieces around the login flow:
//!
//! - [`ClientConfig`]: `config.json` with the application credentials
//! - [`Presets`]: `presets.json` mapping item names to UPCs
//! - [`CartClient`]: the authenticated "add to cart" call

mod cart;
mod config;
mod error;
mod presets;

pub use cart::{CartClient, KROGER_API_BASE};
pub use config::{ClientConfig, DEFAULT_CONFIG_FILE};
pub use error::{CartError, ConfigError};
pub use presets::{Presets, DEFAULT_PRESETS_FILE};
