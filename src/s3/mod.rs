//! S3 Client module
//!
//! Object storage access for the uploader: a file PUT and a prefix listing.
//!
//! The [`ObjectStore`] trait is the seam the uploader works against.
//! [`S3ObjectStore`] implements it on top of `aws-sdk-s3`.
//!
//! # Example
//!
//! ```no_run
//! use teda_check::s3::{Credentials, ObjectStore, S3ObjectStore, S3StoreConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = S3StoreConfig {
//!     region: "us-east-1".to_string(),
//!     endpoint: None,
//! };
//! let store = S3ObjectStore::connect(&config, Credentials::new("ak", "sk")).await;
//!
//! store.put_file("teda-ingest", "catalog_data.csv", Path::new("catalog_data.csv")).await?;
//! let listing = store.list_prefix("teda-ingest", "catalog_data.csv").await?;
//! assert!(listing.has_contents());
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! | Operation | Span Name | Attributes |
//! |-----------|-----------|------------|
//! | PutObject | `s3.put_object` | bucket, key, etag |
//! | ListObjectsV2 | `s3.list_objects_v2` | bucket, prefix, key_count |

pub mod credentials;

pub use credentials::{Credentials, CredentialsError, CredentialsProvider};

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::RequestChecksumCalculation;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::{ByteStream, ByteStreamError};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// S3 client errors
///
/// Service errors keep the SDK error as their source.
#[derive(Error, Debug)]
pub enum S3Error {
    #[error("Failed to read upload body from {path:?}: {source}")]
    ReadBody {
        path: PathBuf,
        #[source]
        source: ByteStreamError,
    },

    #[error("PutObject failed for s3://{bucket}/{key}: {source}")]
    Put {
        bucket: String,
        key: String,
        #[source]
        source: aws_sdk_s3::Error,
    },

    #[error("ListObjectsV2 failed for s3://{bucket}/{prefix}: {source}")]
    List {
        bucket: String,
        prefix: String,
        #[source]
        source: aws_sdk_s3::Error,
    },
}

/// Object storage operations used by the uploader
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` to `bucket` under `key`, returning the ETag if any
    async fn put_file(&self, bucket: &str, key: &str, path: &Path)
        -> Result<Option<String>, S3Error>;

    /// List the objects in `bucket` whose key starts with `prefix` (first page)
    async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<ListingResult, S3Error>;
}

/// Connection settings for [`S3ObjectStore`]
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    pub region: String,
    /// S3-compatible endpoint. Switches to path-style addressing.
    pub endpoint: Option<String>,
}

impl From<&crate::config::StorageConfig> for S3StoreConfig {
    fn from(storage: &crate::config::StorageConfig) -> Self {
        Self {
            region: storage.region.clone(),
            endpoint: storage.endpoint.clone(),
        }
    }
}

/// `aws-sdk-s3` backed object store
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client with static credentials
    ///
    /// The SDK retry policy is disabled: failures reach the caller on the
    /// first attempt.
    pub async fn connect(config: &S3StoreConfig, credentials: Credentials) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(aws_credential_types::Credentials::from(credentials))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(true)
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        }

        tracing::debug!(
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 client configured"
        );

        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, path),
        fields(s3.bucket = %bucket, s3.key = %key, s3.etag = tracing::field::Empty),
        err
    )]
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<Option<String>, S3Error> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|source| S3Error::ReadBody {
                path: path.to_path_buf(),
                source,
            })?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %DisplayErrorContext(&e), "PutObject failed");
                S3Error::Put {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source: e.into(),
                }
            })?;

        let etag = output.e_tag().map(str::to_string);
        if let Some(ref etag) = etag {
            tracing::Span::current().record("s3.etag", etag.as_str());
        }

        Ok(etag)
    }

    #[tracing::instrument(
        name = "s3.list_objects_v2",
        skip(self),
        fields(s3.bucket = %bucket, s3.prefix = %prefix, s3.key_count = tracing::field::Empty),
        err
    )]
    async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<ListingResult, S3Error> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %DisplayErrorContext(&e), "ListObjectsV2 failed");
                S3Error::List {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    source: e.into(),
                }
            })?;

        let listing = ListingResult::from_output(prefix, &output);
        tracing::Span::current().record("s3.key_count", listing.key_count);

        Ok(listing)
    }
}

/// One object returned by a prefix listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            etag: None,
            last_modified: None,
        }
    }
}

/// Result of listing a bucket by key prefix
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingResult {
    pub prefix: String,
    pub entries: Vec<ObjectEntry>,
    pub key_count: usize,
    pub is_truncated: bool,
}

impl ListingResult {
    /// Build a listing from entries
    pub fn new(prefix: impl Into<String>, entries: Vec<ObjectEntry>) -> Self {
        Self {
            prefix: prefix.into(),
            key_count: entries.len(),
            entries,
            is_truncated: false,
        }
    }

    fn from_output(prefix: &str, output: &ListObjectsV2Output) -> Self {
        let entries: Vec<ObjectEntry> = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(ObjectEntry {
                    key: key.to_string(),
                    size: object.size().unwrap_or_default().max(0) as u64,
                    etag: object.e_tag().map(str::to_string),
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                })
            })
            .collect();

        let key_count = output
            .key_count()
            .map(|count| count.max(0) as usize)
            .unwrap_or(entries.len());

        Self {
            prefix: prefix.to_string(),
            entries,
            key_count,
            is_truncated: output.is_truncated().unwrap_or(false),
        }
    }

    /// True when at least one object is stored under the prefix
    pub fn has_contents(&self) -> bool {
        !self.entries.is_empty()
    }

    /// True when an object with exactly this key was listed
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
