//! Configuration loader for INI check files

use super::{Config, ConfigError};
use config::{File, FileFormat};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an INI file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ini_str(&content)
    }

    /// Parse configuration from INI text
    pub fn from_ini_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Ini))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ini_str_minimal() {
        let content = "[DEFAULT]\nregion = us-east-1\nbucket = teda-ingest\n";
        let config = ConfigLoader::from_ini_str(content).unwrap();
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.bucket, "teda-ingest");
        assert!(config.credentials.ack.is_none());
        assert_eq!(config.endpoints.catalog, "https://teda.com/catalog");
    }

    #[test]
    fn test_from_ini_str_missing_bucket() {
        let content = "[DEFAULT]\nregion = us-east-1\n";
        assert!(ConfigLoader::from_ini_str(content).is_err());
    }
}
