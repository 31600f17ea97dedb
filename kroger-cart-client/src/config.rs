//! Application credentials file.

use std::path::Path;

use kroger_cart_auth::{kroger_oauth_config, OAuthConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Kroger application client ID.
    #[serde(rename = "kroger-client-id", default)]
    pub client_id: String,
    /// Kroger application client secret.
    #[serde(rename = "kroger-client-secret", default, skip_serializing)]
    pub client_secret: String,
    /// Store the cart is tied to.
    #[serde(rename = "location-id", default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

impl ClientConfig {
    /// Read and validate the config file.
    ///
    /// An empty client ID or secret is rejected here, before any network
    /// activity.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&data).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        if config.client_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
                field: "kroger-client-id",
            });
        }
        if config.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
                field: "kroger-client-secret",
            });
        }
        Ok(config)
    }

    /// OAuth configuration for these credentials with the Kroger defaults.
    pub fn oauth_config(&self) -> OAuthConfig {
        kroger_oauth_config(&self.client_id, &self.client_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{"kroger-client-id":"id","kroger-client-secret":"secret","location-id":"01400943"}"#,
        );

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.location_id.as_deref(), Some("01400943"));

        let oauth = config.oauth_config();
        assert_eq!(oauth.client_id, "id");
        assert_eq!(oauth.client_secret, "secret");
        assert_eq!(oauth.redirect_uri, "http://localhost:8080/callback");
    }

    #[test]
    fn test_location_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{"kroger-client-id":"id","kroger-client-secret":"secret"}"#);
        assert_eq!(ClientConfig::load(&path).unwrap().location_id, None);
    }

    #[test]
    fn test_missing_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{"kroger-client-id":"id","kroger-client-secret":""}"#);
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ConfigError::Missing { field: "kroger-client-secret", .. })
        ));
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ClientConfig::load(dir.path().join("nope.json")),
            Err(ConfigError::Read { .. })
        ));

        let path = write(&dir, "[1, 2");
        assert!(matches!(ClientConfig::load(&path), Err(ConfigError::Decode { .. })));
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = ClientConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            location_id: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("kroger-client-secret"));
        assert!(json.contains("kroger-client-id"));
    }
}
