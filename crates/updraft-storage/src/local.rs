use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use updraft_core::StoreBackend;

use crate::keys;
use crate::traits::{
    ObjectRef, SignedUrlOptions, Store, StoreError, StoreResult, StoredObject, UploadTarget,
    UrlOptions,
};

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStore {
    /// Create a new LocalStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/updraft/uploads")
    /// * `base_url` - Base URL for serving files (e.g., "/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StoreResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Keys must stay inside the base storage directory, so traversal
    /// sequences and absolute paths are rejected.
    fn key_to_path(&self, storage_key: &str) -> StoreResult<PathBuf> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StoreError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(storage_key))
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn store(&self, source: &Path, target: &UploadTarget) -> StoreResult<StoredObject> {
        let key = keys::original_key(&target.sha1, &target.extension);
        let path = self.key_to_path(&key)?;

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut src = fs::File::open(source).await.map_err(|e| {
            StoreError::StoreFailed(format!(
                "Failed to open staged file {}: {}",
                source.display(),
                e
            ))
        })?;

        let mut dst = fs::File::create(&path).await.map_err(|e| {
            StoreError::StoreFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let size_bytes = tokio::io::copy(&mut src, &mut dst).await.map_err(|e| {
            StoreError::StoreFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        dst.sync_all().await.map_err(|e| {
            StoreError::StoreFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store commit successful"
        );

        Ok(StoredObject { key, url })
    }

    fn has_been_stored(&self, url: &str) -> bool {
        url.starts_with(&format!("{}/", self.base_url))
    }

    fn path_for(&self, storage_key: &str) -> Option<PathBuf> {
        self.key_to_path(storage_key).ok()
    }

    async fn url_for(&self, object: &ObjectRef, _opts: &UrlOptions) -> StoreResult<String> {
        // Local objects are served by this application; download forcing is
        // applied via response headers at the edge, not in the URL.
        Ok(object.url.clone())
    }

    async fn signed_url_for_path(
        &self,
        path: &str,
        _opts: &SignedUrlOptions,
    ) -> StoreResult<String> {
        // No signing for internal storage; the plain URL is as good as it gets.
        Ok(self.generate_url(path.trim_start_matches('/')))
    }

    fn cdn_url(&self, url: &str) -> String {
        url.to_string()
    }

    fn is_internal(&self) -> bool {
        true
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Local
    }
}
