//! Database repositories for data access layer
//!
//! Each repository owns one domain entity and provides its queries. The only
//! entity in this service is the upload record.

pub mod uploads;

pub use uploads::{NewUpload, Upload, UploadRepository};
