//! TLS settings for serving the contact endpoints directly over HTTPS
//!
//! Most deployments terminate TLS at a proxy; set `TLS_ENABLED=true` with a
//! PEM certificate and key to let `axum-server` do it instead.

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub port: u16,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            cert_path: PathBuf::new(),
            key_path: PathBuf::new(),
            port: 8443,
        }
    }

    pub fn from_env() -> Result<Self> {
        let enabled = env::var("TLS_ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if !enabled {
            return Ok(Self::disabled());
        }

        Ok(Self {
            enabled: true,
            cert_path: env::var("TLS_CERT_PATH")
                .context("TLS_CERT_PATH must be set when TLS is enabled")?
                .into(),
            key_path: env::var("TLS_KEY_PATH")
                .context("TLS_KEY_PATH must be set when TLS is enabled")?
                .into(),
            port: env::var("TLS_PORT")
                .unwrap_or_else(|_| "8443".to_string())
                .parse()
                .context("Invalid TLS_PORT")?,
        })
    }

    /// Load the PEM pair for `axum_server::bind_rustls`
    pub async fn rustls_config(&self) -> Result<RustlsConfig> {
        if !self.enabled {
            anyhow::bail!("TLS is not enabled");
        }

        for (what, path) in [("certificate", &self.cert_path), ("private key", &self.key_path)] {
            if !path.exists() {
                anyhow::bail!("TLS {} not found at {:?}", what, path);
            }
        }

        let config = RustlsConfig::from_pem_file(&self.cert_path, &self.key_path)
            .await
            .context("Failed to load TLS certificates")?;

        tracing::info!(cert = ?self.cert_path, "TLS certificate loaded");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_config_refuses_to_load() {
        assert!(TlsConfig::disabled().rustls_config().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_certificate_is_reported() {
        let config = TlsConfig {
            enabled: true,
            cert_path: PathBuf::from("/nonexistent/britonia/cert.pem"),
            key_path: PathBuf::from("/nonexistent/britonia/key.pem"),
            port: 8443,
        };

        let err = config.rustls_config().await.unwrap_err();
        assert!(err.to_string().contains("certificate not found"));
    }
}
