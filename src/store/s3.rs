//! S3-compatible blob store
//!
//! Works against MinIO, Cloudflare R2, Backblaze B2, and AWS S3. Download
//! URLs are presigned GETs so readers need no credentials of their own.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};

use super::traits::BlobStore;
use crate::error::StoreError;

/// Default lifetime of presigned download URLs: 7 days (the S3 maximum)
const DEFAULT_URL_EXPIRY_SECS: u64 = 7 * 24 * 3600;

/// Connection settings for an S3-compatible endpoint
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Lifetime of presigned download URLs
    pub url_expiry: Duration,
}

impl S3Config {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: None,
            url_expiry: Duration::from_secs(DEFAULT_URL_EXPIRY_SECS),
        }
    }
}

/// Blob store backed by an S3-compatible bucket
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    url_expiry: Duration,
}

impl S3BlobStore {
    /// Create a client from configuration
    pub async fn new(config: &S3Config) -> Result<Self, StoreError> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "recuerdo",
        );

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO and other S3-compatible services
            .build();

        let client = Client::from_conf(s3_config);

        let bucket = config.bucket.clone();
        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => {
                tracing::info!(bucket = %bucket, "Connected to S3 bucket");
            }
            Err(e) => {
                tracing::warn!(
                    bucket = %bucket,
                    error = %e,
                    "Could not verify bucket, will attempt operations anyway"
                );
            }
        }

        Ok(Self {
            client,
            bucket,
            url_expiry: config.url_expiry,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to put object {}: {}", path, e)))?;

        tracing::debug!(key = %path, bytes = data.len(), "Uploaded object");
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(self.url_expiry)
            .map_err(|e| StoreError::Backend(format!("Invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to presign {}: {}", path, e)))?;

        Ok(request.uri().to_string())
    }
}
