//! Updraft Database Library
//!
//! This crate provides the repository layer for the upload record store.
//! All queries use dynamic sqlx so builds never require a live DATABASE_URL.

pub mod db;

// Re-export commonly used types
pub use db::uploads::{NewUpload, Upload, UploadRepository};
