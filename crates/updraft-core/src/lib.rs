//! Updraft Core Library
//!
//! This crate provides the domain types shared across all Updraft components:
//! configuration, error types, content addressing, upload validation, and the
//! requester privilege model.

pub mod config;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod privilege;
pub mod short_url;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use constants::SECURE_REDIRECT_GRACE_SECONDS;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use privilege::{Requester, UserContext};
pub use storage_types::StoreBackend;
pub use validation::{humanize_bytes, UploadPolicy, ValidationFailure};
