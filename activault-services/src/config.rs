//! Server configuration.
//!
//! Both keys are provisioned through configuration, never embedded in
//! source: the RSA signing key as a PEM file path, the artifact
//! encryption key as base64. Loading fails fast at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Crypto(#[from] activault_crypto::CryptoError),

    #[error(transparent)]
    Store(#[from] activault_store::StoreError),
}

/// Configuration of the issuing server core.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// PEM file holding the RSA private signing key (PKCS#8 or PKCS#1).
    pub signing_key_path: PathBuf,
    /// AES-256 artifact key, standard base64 (32 bytes decoded).
    pub artifact_key_base64: String,
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg = ServerConfig::from_toml_str(
            r#"
            database_path = "/var/lib/activault/entitlements.db"
            signing_key_path = "/etc/activault/server.pem"
            artifact_key_base64 = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
            "#,
        )
        .unwrap();
        assert_eq!(cfg.signing_key_path, Path::new("/etc/activault/server.pem"));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let err = ServerConfig::from_toml_str("database_path = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ServerConfig::from_toml_file(Path::new("/nonexistent/activault.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
