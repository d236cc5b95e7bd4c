//! S3 Credentials Module
//!
//! Resolves the access key pair used by the object store client.
//!
//! Credentials come from the `[credentials]` section of the check file
//! (`ack` / `sck`) and fall back to the standard AWS environment variables
//! when that section is empty.
//!
//! # Example
//!
//! ```
//! use teda_check::s3::Credentials;
//!
//! let creds = Credentials::new("access-key", "secret-key");
//! assert_eq!(creds.access_key_id(), "access-key");
//! assert_eq!(creds.secret_access_key(), "secret-key");
//! ```

use crate::config::CredentialsConfig;
use thiserror::Error;

/// Provider name reported to the AWS SDK
const PROVIDER_NAME: &str = "teda-check";

/// Credential loading errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Access key pair for object storage
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

impl Credentials {
    /// Create new credentials
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Create credentials with session token (for temporary credentials)
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: Some(session_token.into()),
        }
    }

    /// Get the access key ID
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token (if any)
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl From<Credentials> for aws_credential_types::Credentials {
    fn from(creds: Credentials) -> Self {
        aws_credential_types::Credentials::new(
            creds.access_key_id,
            creds.secret_access_key,
            creds.session_token,
            None,
            PROVIDER_NAME,
        )
    }
}

/// Factory methods for loading credentials
pub struct CredentialsProvider;

impl CredentialsProvider {
    /// Load credentials from environment variables
    ///
    /// Looks for:
    /// - `AWS_ACCESS_KEY_ID`
    /// - `AWS_SECRET_ACCESS_KEY`
    /// - `AWS_SESSION_TOKEN` (optional)
    pub fn from_env() -> Result<Credentials, CredentialsError> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            CredentialsError::MissingCredentials("AWS_ACCESS_KEY_ID not set".into())
        })?;

        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            CredentialsError::MissingCredentials("AWS_SECRET_ACCESS_KEY not set".into())
        })?;

        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(match session_token {
            Some(token) => Credentials::with_session_token(access_key, secret_key, token),
            None => Credentials::new(access_key, secret_key),
        })
    }

    /// Load credentials from the `[credentials]` section
    pub fn from_config(config: &CredentialsConfig) -> Result<Credentials, CredentialsError> {
        let access_key = config.ack.as_deref().ok_or_else(|| {
            CredentialsError::MissingCredentials("credentials.ack not set in config".into())
        })?;

        let secret_key = config.sck.as_deref().ok_or_else(|| {
            CredentialsError::MissingCredentials("credentials.sck not set in config".into())
        })?;

        for (name, value) in [("ack", access_key), ("sck", secret_key)] {
            if value.trim().is_empty() {
                return Err(CredentialsError::InvalidCredentials(format!(
                    "credentials.{} is empty",
                    name
                )));
            }
            if value.starts_with("${") {
                return Err(CredentialsError::InvalidCredentials(format!(
                    "credentials.{} references an unset environment variable: {}",
                    name, value
                )));
            }
        }

        Ok(Credentials::new(access_key, secret_key))
    }

    /// Resolve credentials: the config section wins, the environment is the fallback
    ///
    /// A partially filled section is an error rather than a silent fallback.
    pub fn resolve(config: &CredentialsConfig) -> Result<Credentials, CredentialsError> {
        if config.ack.is_none() && config.sck.is_none() {
            tracing::debug!("No credentials in config, falling back to environment");
            return Self::from_env();
        }
        Self::from_config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_creation() {
        let creds = Credentials::new("access", "secret");
        assert_eq!(creds.access_key_id(), "access");
        assert_eq!(creds.secret_access_key(), "secret");
        assert!(creds.session_token().is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::with_session_token("access", "very-secret", "token");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("access"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("token\""));
    }

    #[test]
    fn test_from_config_missing_access_key() {
        let config = CredentialsConfig {
            ack: None,
            sck: Some("secret".into()),
        };

        let result = CredentialsProvider::from_config(&config);
        assert!(matches!(result, Err(CredentialsError::MissingCredentials(_))));
    }

    #[test]
    fn test_from_config_unexpanded_placeholder() {
        let config = CredentialsConfig {
            ack: Some("${TEDA_ACCESS_KEY}".into()),
            sck: Some("secret".into()),
        };

        let result = CredentialsProvider::from_config(&config);
        assert!(matches!(result, Err(CredentialsError::InvalidCredentials(_))));
    }

    #[test]
    fn test_resolve_partial_section_is_error() {
        let config = CredentialsConfig {
            ack: Some("access".into()),
            sck: None,
        };

        assert!(CredentialsProvider::resolve(&config).is_err());
    }

    #[test]
    fn test_from_config_success() {
        let config = CredentialsConfig {
            ack: Some("config-access".into()),
            sck: Some("config-secret".into()),
        };

        let creds = CredentialsProvider::from_config(&config).unwrap();
        assert_eq!(creds.access_key_id(), "config-access");
        assert_eq!(creds.secret_access_key(), "config-secret");
    }

    #[test]
    fn test_into_sdk_credentials() {
        let creds: aws_credential_types::Credentials =
            Credentials::new("config-access", "config-secret").into();
        assert_eq!(creds.access_key_id(), "config-access");
        assert_eq!(creds.secret_access_key(), "config-secret");
    }
}
