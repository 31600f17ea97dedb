//! Opening the authorization URL in the user's browser.

use std::sync::Arc;

use tracing::debug;

use crate::error::LaunchError;

/// Something that can show a URL to the user.
pub trait BrowserLauncher: Send + Sync + std::fmt::Debug {
    /// Hand `url` to the browser. Best effort: callers must not fail on error.
    fn open(&self, url: &str) -> Result<(), LaunchError>;
}

/// Type alias for shared launchers.
pub type BoxedLauncher = Arc<dyn BrowserLauncher>;

/// Opens URLs with the desktop's default handler.
///
/// Returns as soon as the handler is spawned; it never waits for the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl BrowserLauncher for SystemLauncher {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        debug!("Launching system browser");
        open::that_detached(url).map_err(LaunchError::Open)
    }
}

/// The launcher [`crate::Authenticator::new`] uses.
pub fn system_launcher() -> BoxedLauncher {
    Arc::new(SystemLauncher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    impl BrowserLauncher for Unavailable {
        fn open(&self, _url: &str) -> Result<(), LaunchError> {
            Err(LaunchError::Open(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no handler",
            )))
        }
    }

    #[test]
    fn test_launchers_are_shareable() {
        let launchers: Vec<BoxedLauncher> = vec![system_launcher(), Arc::new(Unavailable)];
        assert!(format!("{:?}", launchers[0]).contains("SystemLauncher"));

        let err = launchers[1].open("https://example.com").unwrap_err();
        assert_eq!(err.to_string(), "Failed to open browser: no handler");
    }
}
