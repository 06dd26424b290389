//! Updraft Storage Library
//!
//! This crate provides the backing-store abstraction and implementations for
//! Updraft. It includes the Store trait and implementations for S3 and the
//! local filesystem.
//!
//! # Storage key format
//!
//! Originals are stored content-addressed. All backends use the same key
//! layout for consistency:
//!
//! - `original/{sha1}.{extension}`
//! - `original/{sha1}` when the upload has no extension
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod disposition;
pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3Store;
pub use traits::{
    ObjectRef, SignedUrlOptions, Store, StoreError, StoreResult, StoredObject, UploadTarget,
    UrlOptions,
};
pub use updraft_core::StoreBackend;
