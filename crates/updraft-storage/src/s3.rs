use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::fs;
use updraft_core::StoreBackend;

use crate::disposition;
use crate::keys;
use crate::traits::{
    ObjectRef, SignedUrlOptions, Store, StoreError, StoreResult, StoredObject, UploadTarget,
    UrlOptions,
};

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    base_url: String,
    cdn_url: Option<String>,
    presign_expiry: Duration,
}

impl S3Store {
    /// Create a new S3Store instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO, "https://nyc3.digitaloceanspaces.com" for DigitalOcean Spaces)
    /// * `cdn_url` - Optional CDN base that public object URLs are rewritten onto
    /// * `presign_expiry` - Lifetime of presigned URLs for secure objects
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        cdn_url: Option<String>,
        presign_expiry: Duration,
    ) -> StoreResult<Self> {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .retry_config(retry_config)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = endpoint_url {
            // S3-compatible providers generally require path-style addressing.
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        let base_url = match endpoint_url {
            Some(ref endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
        };

        Ok(S3Store {
            client,
            bucket,
            base_url,
            cdn_url: cdn_url.map(|url| url.trim_end_matches('/').to_string()),
            presign_expiry,
        })
    }

    /// Generate public URL for S3 object
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Presign a GET for the given key, optionally overriding the
    /// Content-Disposition the bucket responds with.
    async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
        disposition: Option<String>,
    ) -> StoreResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StoreError::ConfigError(e.to_string()))?;

        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(disposition) = disposition {
            request = request.response_content_disposition(disposition);
        }

        let presigned = request
            .presigned(presigning)
            .await
            .map_err(|e| StoreError::BackendError(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl Store for S3Store {
    async fn store(&self, source: &Path, target: &UploadTarget) -> StoreResult<StoredObject> {
        let key = keys::original_key(&target.sha1, &target.extension);
        let size_bytes = fs::metadata(source).await.map(|m| m.len()).unwrap_or(0);
        let start = std::time::Instant::now();

        let body = ByteStream::from_path(source).await.map_err(|e| {
            StoreError::StoreFailed(format!(
                "Failed to read staged file {}: {}",
                source.display(),
                e
            ))
        })?;

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&target.content_type)
            .body(body)
            .send()
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %DisplayErrorContext(&e),
                bucket = %self.bucket,
                key = %key,
                size_bytes,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 store failed"
            );
            StoreError::StoreFailed(DisplayErrorContext(&e).to_string())
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 store successful"
        );

        Ok(StoredObject { key, url })
    }

    fn has_been_stored(&self, url: &str) -> bool {
        url.starts_with(&format!("{}/", self.base_url))
            || self
                .cdn_url
                .as_ref()
                .is_some_and(|cdn| url.starts_with(&format!("{}/", cdn)))
    }

    fn path_for(&self, _storage_key: &str) -> Option<PathBuf> {
        None
    }

    async fn url_for(&self, object: &ObjectRef, opts: &UrlOptions) -> StoreResult<String> {
        if object.secure || opts.force_download {
            let disposition = opts
                .force_download
                .then(|| disposition::attachment(&object.filename));
            self.presign_get(&object.key, self.presign_expiry, disposition)
                .await
        } else {
            Ok(self.cdn_url(&object.url))
        }
    }

    async fn signed_url_for_path(
        &self,
        path: &str,
        opts: &SignedUrlOptions,
    ) -> StoreResult<String> {
        let key = path.trim_start_matches('/');
        let disposition = opts.force_download.then(|| {
            let filename = key.rsplit('/').next().unwrap_or(key);
            disposition::attachment(filename)
        });

        self.presign_get(key, opts.expires_in, disposition).await
    }

    fn cdn_url(&self, url: &str) -> String {
        match &self.cdn_url {
            Some(cdn) => url.replacen(&self.base_url, cdn, 1),
            None => url.to_string(),
        }
    }

    fn is_internal(&self) -> bool {
        false
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::S3
    }
}

#[cfg(all(test, feature = "storage-s3"))]
mod tests {
    use super::*;

    async fn aws_store() -> S3Store {
        S3Store::new(
            "media-bucket".to_string(),
            "eu-west-1".to_string(),
            None,
            None,
            Duration::from_secs(300),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_virtual_hosted_urls_for_aws() {
        let store = aws_store().await;

        assert!(store.has_been_stored(
            "https://media-bucket.s3.eu-west-1.amazonaws.com/original/abc.png"
        ));
        assert!(!store.has_been_stored("/uploads/original/abc.png"));
        assert!(store.path_for("original/abc.png").is_none());
        assert!(!store.is_internal());
    }

    #[tokio::test]
    async fn test_path_style_urls_for_custom_endpoint() {
        let store = S3Store::new(
            "media-bucket".to_string(),
            "us-east-1".to_string(),
            Some("http://localhost:9000".to_string()),
            None,
            Duration::from_secs(300),
        )
        .await
        .unwrap();

        assert_eq!(
            store.generate_url("original/abc.png"),
            "http://localhost:9000/media-bucket/original/abc.png"
        );
        assert!(store.has_been_stored("http://localhost:9000/media-bucket/original/abc.png"));
    }

    #[tokio::test]
    async fn test_cdn_rewrite() {
        let store = S3Store::new(
            "media-bucket".to_string(),
            "eu-west-1".to_string(),
            None,
            Some("https://cdn.example.com/".to_string()),
            Duration::from_secs(300),
        )
        .await
        .unwrap();

        let url = "https://media-bucket.s3.eu-west-1.amazonaws.com/original/abc.png";
        assert_eq!(
            store.cdn_url(url),
            "https://cdn.example.com/original/abc.png"
        );
        assert!(store.has_been_stored("https://cdn.example.com/original/abc.png"));
    }
}
