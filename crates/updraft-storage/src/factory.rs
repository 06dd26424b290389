#[cfg(feature = "storage-local")]
use crate::LocalStore;
#[cfg(feature = "storage-s3")]
use crate::S3Store;
use crate::{Store, StoreBackend, StoreError, StoreResult};
use std::sync::Arc;
#[cfg(feature = "storage-s3")]
use std::time::Duration;
use updraft_core::Config;

/// Create a storage backend based on configuration
pub async fn create_store(config: &Config) -> StoreResult<Arc<dyn Store>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StoreBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StoreError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .or_else(|| config.aws_region.clone())
                .ok_or_else(|| {
                    StoreError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
                })?;

            let store = S3Store::new(
                bucket,
                region,
                config.s3_endpoint.clone(),
                config.s3_cdn_url.clone(),
                Duration::from_secs(config.presigned_get_expires_seconds),
            )
            .await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        StoreBackend::S3 => Err(StoreError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StoreBackend::Local => {
            let store = LocalStore::new(
                config.local_storage_path.clone(),
                config.local_storage_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StoreBackend::Local => Err(StoreError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
