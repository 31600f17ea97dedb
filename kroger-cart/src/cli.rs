//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::auth::{
    system_launcher, AuthSession, Authenticator, BoxedLauncher, BrowserLauncher,
    CancellationToken, LaunchError, TokenStore, DEFAULT_TOKEN_FILE,
};
use crate::client::{CartClient, ClientConfig, Presets, DEFAULT_CONFIG_FILE, DEFAULT_PRESETS_FILE};

/// Add preset grocery items to your Kroger cart.
#[derive(Debug, Parser)]
#[command(name = "kroger-cart", version, about)]
pub struct Cli {
    /// Application credentials file.
    #[arg(long, env = "KROGER_CART_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Item name to UPC mapping file.
    #[arg(long, env = "KROGER_CART_PRESETS", default_value = DEFAULT_PRESETS_FILE, global = true)]
    pub presets: PathBuf,

    /// Where the access token is cached between runs.
    #[arg(long, env = "KROGER_CART_TOKEN_FILE", default_value = DEFAULT_TOKEN_FILE, global = true)]
    pub token_file: PathBuf,

    /// Seconds to wait for the browser login to complete.
    #[arg(long, env = "KROGER_CART_TIMEOUT", default_value_t = 120, global = true)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in, or confirm the cached token is still valid.
    Login,
    /// Add a preset item to the cart.
    Add {
        /// Item name from the presets file.
        item: String,
        /// How many to add.
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// List the preset items.
    Presets,
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Presets => {
            let presets = Presets::load(&cli.presets)?;
            if presets.is_empty() {
                println!("No presets in {}.", cli.presets.display());
            }
            for item in presets.items() {
                println!("{}\t{}", item, presets.product_id(item).unwrap_or_default());
            }
        }
        Command::Login => {
            let config = ClientConfig::load(&cli.config).context("Error loading config")?;
            let session = authenticate(&cli, &config).await?;
            println!(
                "Authorized! Token valid until {}.",
                session.credential.expiry.to_rfc2822()
            );
        }
        Command::Add { item, quantity } => {
            let config = ClientConfig::load(&cli.config).context("Error loading config")?;
            let presets = Presets::load(&cli.presets)?;
            if presets.product_id(item).is_none() {
                anyhow::bail!("No preset product ID for item: {item}");
            }

            let session = authenticate(&cli, &config).await?;
            CartClient::new(session.credential, presets)
                .with_location(config.location_id.clone())
                .add_to_cart(item, *quantity)
                .await?;
            println!("Added {quantity} of {item} to your Kroger cart.");
        }
    }
    Ok(())
}

async fn authenticate(cli: &Cli, config: &ClientConfig) -> anyhow::Result<AuthSession> {
    let oauth = config.oauth_config().with_timeout(cli.timeout_secs);
    let auth = Authenticator::new(oauth, TokenStore::new(&cli.token_file))
        .with_launcher(Arc::new(TerminalLauncher::new(system_launcher())));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling login");
            on_interrupt.cancel();
        }
    });

    let result = auth
        .authenticate_with(auth.config().callback_timeout(), &cancel)
        .await;
    watcher.abort();

    result.context("Authentication failed")
}

/// Tries the desktop browser and falls back to printing the URL, so a
/// headless login can still be completed by hand.
#[derive(Debug)]
struct TerminalLauncher {
    browser: BoxedLauncher,
}

impl TerminalLauncher {
    fn new(browser: BoxedLauncher) -> Self {
        Self { browser }
    }
}

impl BrowserLauncher for TerminalLauncher {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        if let Err(e) = self.browser.open(url) {
            warn!("Could not open browser: {}", e);
            eprintln!("Open the following URL in your browser to continue:\n\n  {url}\n");
        }
        Ok(())
    }
}
