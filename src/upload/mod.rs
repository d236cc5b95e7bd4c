//! Upload module
//!
//! Uploads a local file under a key equal to its file name and reads the
//! bucket back by that key prefix.
//!
//! # Example
//!
//! ```no_run
//! use teda_check::s3::{Credentials, S3ObjectStore, S3StoreConfig};
//! use teda_check::upload::Uploader;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = S3StoreConfig { region: "us-east-1".into(), endpoint: None };
//! let store = S3ObjectStore::connect(&config, Credentials::new("ak", "sk")).await;
//! let uploader = Uploader::new(store, "teda-ingest", ".");
//!
//! let listing = uploader.upload("catalog_data.csv").await?;
//! assert!(listing.has_contents());
//! # Ok(())
//! # }
//! ```

use crate::metrics;
use crate::s3::{ListingResult, ObjectStore, S3Error};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Upload source {path:?} is not readable: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] S3Error),

    #[error("s3://{bucket}/{key} was uploaded but is not listed")]
    NotListed { bucket: String, key: String },
}

/// One upload: where the bytes come from and where they go
///
/// Credentials are bound to the object store client rather than carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local_path: PathBuf,
    pub bucket: String,
    pub key: String,
}

impl UploadRequest {
    /// Build the request for `filename` inside `working_dir`; the key is the file name
    pub fn for_file(
        working_dir: &Path,
        bucket: &str,
        filename: &str,
    ) -> Result<Self, UploadError> {
        if filename.trim().is_empty() {
            return Err(UploadError::InvalidFileName(filename.to_string()));
        }

        Ok(Self {
            local_path: working_dir.join(filename),
            bucket: bucket.to_string(),
            key: filename.to_string(),
        })
    }
}

/// Upload-and-list helper bound to one bucket
pub struct Uploader<S> {
    store: S,
    bucket: String,
    working_dir: PathBuf,
}

impl<S: ObjectStore> Uploader<S> {
    pub fn new(store: S, bucket: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the directory file names are resolved against
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Upload `filename` and return the listing under its key
    ///
    /// Errors from the store are returned as-is; nothing is retried.
    #[tracing::instrument(
        name = "upload.file",
        skip(self),
        fields(s3.bucket = %self.bucket, upload.bytes = tracing::field::Empty),
        err
    )]
    pub async fn upload(&self, filename: &str) -> Result<ListingResult, UploadError> {
        let request = UploadRequest::for_file(&self.working_dir, &self.bucket, filename)?;
        let start_time = Instant::now();

        let result = self.execute(&request).await;

        let duration = start_time.elapsed();
        metrics::record_upload_duration(&self.bucket, duration.as_secs_f64());

        match result {
            Ok((bytes, listing)) => {
                metrics::record_upload_success(&self.bucket, bytes);
                tracing::Span::current().record("upload.bytes", bytes);
                tracing::info!(
                    key = %request.key,
                    bytes = bytes,
                    listed = listing.len(),
                    duration_ms = duration.as_millis(),
                    "Upload completed"
                );
                Ok(listing)
            }
            Err(e) => {
                metrics::record_upload_failure(&self.bucket);
                metrics::record_error("upload");
                tracing::error!(
                    key = %request.key,
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "Upload failed"
                );
                Err(e)
            }
        }
    }

    /// Upload `filename` and fail unless the listing contains at least one entry
    pub async fn upload_and_verify(&self, filename: &str) -> Result<ListingResult, UploadError> {
        let listing = self.upload(filename).await?;
        if !listing.has_contents() {
            return Err(UploadError::NotListed {
                bucket: self.bucket.clone(),
                key: filename.to_string(),
            });
        }
        Ok(listing)
    }

    async fn execute(&self, request: &UploadRequest) -> Result<(u64, ListingResult), UploadError> {
        let metadata = tokio::fs::metadata(&request.local_path)
            .await
            .map_err(|source| UploadError::MissingFile {
                path: request.local_path.clone(),
                source,
            })?;

        let etag = self
            .store
            .put_file(&request.bucket, &request.key, &request.local_path)
            .await?;
        tracing::debug!(key = %request.key, etag = ?etag, "PutObject accepted");

        let listing = self.store.list_prefix(&request.bucket, &request.key).await?;

        Ok((metadata.len(), listing))
    }
}
