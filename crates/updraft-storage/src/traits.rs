//! Storage abstraction trait
//!
//! This module defines the Store trait that all storage backends must implement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use updraft_core::{AppError, StoreBackend};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store failed: {0}")]
    StoreFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => AppError::NotFound(key),
            other => AppError::Store(other.to_string()),
        }
    }
}

/// Identity of an original about to be committed to the store.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub sha1: String,
    pub extension: String,
    pub content_type: String,
}

/// A committed original: its storage key and public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Reference to an object already recorded in the upload repository.
#[derive(Debug, Clone)]
pub struct ObjectRef {
    pub key: String,
    pub url: String,
    pub filename: String,
    pub secure: bool,
}

/// Options for resolving an object's serving URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlOptions {
    pub force_download: bool,
}

/// Options for signing an arbitrary store path.
#[derive(Debug, Clone, Copy)]
pub struct SignedUrlOptions {
    pub expires_in: Duration,
    pub force_download: bool,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// This allows the ingestion pipeline and the retrieval gate to work with any
/// backend without coupling to specific implementation details.
///
/// **Key format:** `original/{sha1}.{extension}`. See the crate root
/// documentation.
#[async_trait]
pub trait Store: Send + Sync {
    /// Commit a staged file to the store under its content-addressed key.
    ///
    /// `source` is a fully written local file (usually a tempfile). Returns
    /// the storage key and the public URL of the committed object.
    async fn store(&self, source: &Path, target: &UploadTarget) -> StoreResult<StoredObject>;

    /// Whether the given URL points at an object this store is responsible for.
    fn has_been_stored(&self, url: &str) -> bool;

    /// Filesystem path for a storage key. Only internal stores can answer;
    /// remote backends return `None`.
    fn path_for(&self, storage_key: &str) -> Option<PathBuf>;

    /// Resolve the URL an object should be served from.
    ///
    /// Secure objects on remote backends resolve to a presigned URL; public
    /// ones to the plain (CDN-rewritten) URL.
    async fn url_for(&self, object: &ObjectRef, opts: &UrlOptions) -> StoreResult<String>;

    /// Generate a temporary signed URL for an arbitrary store path.
    async fn signed_url_for_path(&self, path: &str, opts: &SignedUrlOptions)
        -> StoreResult<String>;

    /// Rewrite a store URL onto the configured CDN, if any.
    fn cdn_url(&self, url: &str) -> String;

    /// Whether objects live on the application host itself.
    fn is_internal(&self) -> bool;

    /// Get the storage backend type
    fn backend_type(&self) -> StoreBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_app_errors() {
        let err: AppError = StoreError::NotFound("original/abc.png".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = StoreError::StoreFailed("disk full".to_string()).into();
        match err {
            AppError::Store(msg) => assert!(msg.contains("disk full")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
