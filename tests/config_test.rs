//! Configuration Loading Tests
//!
//! Check files on disk, environment expansion and the credential fallback.

use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use teda_check::config::{Config, ConfigError};
use teda_check::s3::{CredentialsError, CredentialsProvider};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_check_file() {
    let file = write_config(
        r#"
[DEFAULT]
region = eu-west-1
bucket = teda-ingest
endpoint = http://localhost:9000
working_dir = /data/exports

[credentials]
ack = AKIAEXAMPLE
sck = secretexample

[endpoints]
catalog = http://localhost:8080/catalog
product = http://localhost:8080/product
connect_timeout_secs = 2
read_timeout_secs = 4
timeout_secs = 8

[logging]
level = debug
format = json
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.storage.region, "eu-west-1");
    assert_eq!(config.storage.bucket, "teda-ingest");
    assert_eq!(config.storage.endpoint.as_deref(), Some("http://localhost:9000"));
    assert_eq!(
        config.storage.working_dir(),
        std::path::PathBuf::from("/data/exports")
    );
    assert_eq!(config.credentials.ack.as_deref(), Some("AKIAEXAMPLE"));
    assert_eq!(config.endpoints.catalog, "http://localhost:8080/catalog");
    assert_eq!(config.endpoints.read_timeout(), Duration::from_secs(4));
    assert_eq!(config.endpoints.timeout(), Duration::from_secs(8));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_missing_file() {
    let result = Config::load("/nonexistent/check.ini");
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_invalid_endpoint_url_rejected() {
    let file = write_config(
        "[DEFAULT]\nregion = us-east-1\nbucket = b\n\n[endpoints]\ncatalog = teda.com/catalog\n",
    );
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("catalog")));
}

#[test]
fn test_zero_timeout_rejected() {
    let file = write_config(
        "[DEFAULT]\nregion = us-east-1\nbucket = b\n\n[endpoints]\ntimeout_secs = 0\n",
    );
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_unknown_log_format_rejected() {
    let file =
        write_config("[DEFAULT]\nregion = us-east-1\nbucket = b\n\n[logging]\nformat = xml\n");
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
#[serial]
fn test_credentials_expanded_from_env() {
    std::env::set_var("TEDA_TEST_ACK", "AKIAFROMENV");
    std::env::remove_var("TEDA_TEST_SCK");

    let file = write_config(
        "[DEFAULT]\nregion = us-east-1\nbucket = b\n\n[credentials]\n\
         ack = ${TEDA_TEST_ACK}\nsck = ${TEDA_TEST_SCK:-fallback-secret}\n",
    );
    let config = Config::load(file.path()).unwrap();
    std::env::remove_var("TEDA_TEST_ACK");

    let credentials = CredentialsProvider::resolve(&config.credentials).unwrap();
    assert_eq!(credentials.access_key_id(), "AKIAFROMENV");
    assert_eq!(credentials.secret_access_key(), "fallback-secret");
}

#[test]
#[serial]
fn test_unexpanded_credentials_rejected() {
    std::env::remove_var("TEDA_TEST_MISSING");

    let file = write_config(
        "[DEFAULT]\nregion = us-east-1\nbucket = b\n\n[credentials]\n\
         ack = ${TEDA_TEST_MISSING}\nsck = secret\n",
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.credentials.ack.as_deref(), Some("${TEDA_TEST_MISSING}"));

    assert!(matches!(
        CredentialsProvider::resolve(&config.credentials),
        Err(CredentialsError::InvalidCredentials(_))
    ));
}

#[test]
#[serial]
fn test_missing_section_falls_back_to_aws_env() {
    std::env::set_var("AWS_ACCESS_KEY_ID", "AKIAENV");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "envsecret");
    std::env::remove_var("AWS_SESSION_TOKEN");

    let file = write_config("[DEFAULT]\nregion = us-east-1\nbucket = b\n");
    let config = Config::load(file.path()).unwrap();
    let result = CredentialsProvider::resolve(&config.credentials);

    std::env::remove_var("AWS_ACCESS_KEY_ID");
    std::env::remove_var("AWS_SECRET_ACCESS_KEY");

    let credentials = result.unwrap();
    assert_eq!(credentials.access_key_id(), "AKIAENV");
    assert!(credentials.session_token().is_none());
}
