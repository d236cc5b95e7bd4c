//! teda-check Library
//!
//! Verification checks for the teda ingestion workflow.
//!
//! # Features
//!
//! - **Upload and verify**: PUT a CSV export to S3 under its file name, then
//!   list the bucket by that prefix
//! - **Endpoint probes**: one GET against the catalog or product endpoint,
//!   with status, body and failure conditions surfaced as-is
//! - **Mocking layer**: a transport answering from registered responses,
//!   timing out when nothing is registered
//! - **Suite runner**: tagged cases with depends-on ordering
//!
//! # Example
//!
//! ```no_run
//! use teda_check::config::Config;
//! use teda_check::s3::{CredentialsProvider, S3ObjectStore, S3StoreConfig};
//! use teda_check::suite::{builtin_suite, Runner};
//! use teda_check::upload::Uploader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("check.ini")?;
//!     let credentials = CredentialsProvider::resolve(&config.credentials)?;
//!     let store_config = S3StoreConfig::from(&config.storage);
//!     let store = S3ObjectStore::connect(&store_config, credentials).await;
//!     let uploader = Uploader::new(store, &config.storage.bucket, config.storage.working_dir());
//!
//!     let suite = builtin_suite(&config.endpoints)?;
//!     let report = Runner::new(uploader).run(&suite, &[]).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod s3;
pub mod suite;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use probe::Prober;
pub use upload::Uploader;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
