//! Object-storage client seam.
//!
//! The orchestrator only ever talks to the [`ObjectStore`] trait: one call,
//! `put_object`, taking a destination key, a local source file, and the
//! resolved headers. [`S3Store`] is the production implementation over the
//! AWS SDK; tests substitute a recording mock.
//!
//! ## Header mapping
//!
//! The resolver hands over plain header names. The ones S3 models as typed
//! request fields (`Content-Type`, `Cache-Control`, the canned ACL, …) are
//! set through the SDK builder; anything else — custom directive headers like
//! `X-Robots-Tag` — is injected into the HTTP request directly.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error reading {0}: {1}")]
    Io(String, std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Narrow upload interface the orchestrator depends on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `source`'s bytes under `key` with `headers`.
    ///
    /// Returns the number of bytes transmitted.
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        headers: &BTreeMap<String, String>,
    ) -> Result<u64, StoreError>;
}

/// Connection parameters for [`S3Store::connect`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Region override; the environment/profile chain applies when absent.
    pub region: Option<String>,
    /// Custom endpoint URL, for S3-compatible stores and LocalStack. Forces
    /// path-style addressing.
    pub endpoint: Option<String>,
}

impl StoreConfig {
    pub fn new(
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: None,
            endpoint: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// [`ObjectStore`] over a real S3 bucket.
///
/// Cheap to share: the SDK client is internally reference-counted, so every
/// upload task works from the same connection pool.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client session from explicit credentials.
    pub async fn connect(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let credentials = aws_sdk_s3::config::Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "sitedeploy",
        );
        loader = loader.credentials_provider(credentials);

        let aws_config = loader.load().await;
        let builder = aws_sdk_s3::config::Builder::from(&aws_config);
        let s3_config = if config.endpoint.is_some() {
            builder.force_path_style(true).build()
        } else {
            builder.build()
        };

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        headers: &BTreeMap<String, String>,
    ) -> Result<u64, StoreError> {
        let size = tokio::fs::metadata(source)
            .await
            .map_err(|e| StoreError::Io(source.display().to_string(), e))?
            .len();
        let body = ByteStream::from_path(source).await.map_err(|e| {
            StoreError::Io(source.display().to_string(), std::io::Error::other(e))
        })?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);

        let mut raw_headers: Vec<(String, String)> = Vec::new();
        for (name, value) in headers {
            request = match name.to_ascii_lowercase().as_str() {
                "content-type" => request.content_type(value),
                "content-encoding" => request.content_encoding(value),
                "cache-control" => request.cache_control(value),
                "content-disposition" => request.content_disposition(value),
                "content-language" => request.content_language(value),
                "x-amz-acl" => request.acl(ObjectCannedAcl::from(value.as_str())),
                "x-amz-storage-class" => {
                    request.storage_class(StorageClass::from(value.as_str()))
                }
                _ => {
                    raw_headers.push((name.clone(), value.clone()));
                    request
                }
            };
        }

        let sent = if raw_headers.is_empty() {
            request.send().await
        } else {
            request
                .customize()
                .mutate_request(move |req| {
                    for (name, value) in &raw_headers {
                        req.headers_mut().insert(name.clone(), value.clone());
                    }
                })
                .send()
                .await
        };
        sent.map_err(|e| StoreError::Transport(DisplayErrorContext(&e).to_string()))?;

        debug!(key, bytes = size, "uploaded");
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_builder() {
        let config = StoreConfig::new("www-bucket", "AKID", "SECRET")
            .with_region("eu-west-1")
            .with_endpoint("http://localhost:4566");

        assert_eq!(config.bucket, "www-bucket");
        assert_eq!(config.access_key_id, "AKID");
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn store_config_defaults_to_no_overrides() {
        let config = StoreConfig::new("www-bucket", "AKID", "SECRET");
        assert!(config.region.is_none());
        assert!(config.endpoint.is_none());
    }
}
