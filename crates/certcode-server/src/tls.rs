//! TLS configuration for the HTTPS listener.

use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

/// How the application listener is secured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// No TLS (plaintext). Development only.
    Disabled,
    /// Operator-provided certificate and key files.
    Custom {
        /// Path to PEM-encoded certificate chain.
        cert_path: PathBuf,
        /// Path to PEM-encoded private key.
        key_path: PathBuf,
    },
}

impl TlsMode {
    /// TLS is on only when both files are given.
    pub fn from_paths(
        cert_path: Option<PathBuf>,
        key_path: Option<PathBuf>,
    ) -> Result<Self, TlsConfigError> {
        match (cert_path, key_path) {
            (Some(cert_path), Some(key_path)) => Ok(Self::Custom {
                cert_path,
                key_path,
            }),
            (None, None) => Ok(Self::Disabled),
            _ => Err(TlsConfigError::Incomplete),
        }
    }

    /// Load the rustls server configuration.
    ///
    /// Returns `None` if TLS is disabled.
    pub async fn to_rustls_config(&self) -> Result<Option<RustlsConfig>, TlsConfigError> {
        match self {
            Self::Disabled => Ok(None),
            Self::Custom {
                cert_path,
                key_path,
            } => {
                let config = RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .map_err(|e| {
                        TlsConfigError::Load(format!(
                            "{} / {}: {e}",
                            cert_path.display(),
                            key_path.display()
                        ))
                    })?;
                info!(
                    cert = %cert_path.display(),
                    key = %key_path.display(),
                    "TLS enabled"
                );
                Ok(Some(config))
            }
        }
    }
}

/// TLS configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum TlsConfigError {
    #[error("Both a certificate and a key file are required for TLS")]
    Incomplete,

    #[error("Failed to load TLS files {0}")]
    Load(String),
}
