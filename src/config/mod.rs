//! Configuration module for teda-check
//!
//! Handles loading and parsing of the INI check file (`check.ini`) with
//! support for environment variable expansion and validation.
//!
//! # Example
//!
//! ```ini
//! [DEFAULT]
//! region = eu-west-1
//! bucket = teda-ingest
//!
//! [credentials]
//! ack = ${TEDA_ACCESS_KEY}
//! sck = ${TEDA_SECRET_KEY}
//!
//! [endpoints]
//! catalog = https://teda.com/catalog
//! product = https://teda.com/product
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Default catalog endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://teda.com/catalog";

/// Default product endpoint
pub const DEFAULT_PRODUCT_URL: &str = "https://teda.com/product";

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// Deserializer for optional strings with environment variable expansion.
fn deserialize_opt_with_env<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|s| expand_env_vars(&s)))
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
///
/// Mirrors the sections of the check file. The `DEFAULT` section name is
/// accepted in either case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "DEFAULT", alias = "default")]
    pub storage: StorageConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DEFAULT.region cannot be empty".into(),
            ));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DEFAULT.bucket cannot be empty".into(),
            ));
        }

        if let Some(ref endpoint) = self.storage.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid storage endpoint '{}': must start with http:// or https://",
                    endpoint
                )));
            }
        }

        for (name, url) in [
            ("catalog", &self.endpoints.catalog),
            ("product", &self.endpoints.product),
        ] {
            if !is_valid_http_url(url) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid {} URL '{}': must start with http:// or https://",
                    name, url
                )));
            }
        }

        for (name, secs) in [
            ("connect_timeout_secs", self.endpoints.connect_timeout_secs),
            ("read_timeout_secs", self.endpoints.read_timeout_secs),
            ("timeout_secs", self.endpoints.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "endpoints.{} must be greater than zero",
                    name
                )));
            }
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format '{}': must be 'pretty' or 'json'",
                    self.logging.format
                )));
            }
        }

        Ok(())
    }
}

/// Object storage settings (the `DEFAULT` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub region: String,
    pub bucket: String,
    /// Custom S3-compatible endpoint. Enables path-style addressing.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Directory the fixed CSV files are read from. Default: current directory
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Directory uploads are resolved against
    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Access credentials (the `credentials` section)
///
/// `ack` is the access key id and `sck` the secret key. Both support
/// `${VAR}` and `${VAR:-default}` expansion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub ack: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub sck: Option<String>,
}

/// Probed endpoints and HTTP timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_catalog_url")]
    pub catalog: String,
    #[serde(default = "default_product_url")]
    pub product: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl EndpointsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_url(),
            product: default_product_url(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_product_url() -> String {
    DEFAULT_PRODUCT_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
