//! Response and request DTOs for the upload endpoints.

use serde::{Deserialize, Serialize};
use updraft_core::{humanize_bytes, short_url};
use updraft_db::Upload;
use utoipa::ToSchema;
use validator::Validate;

/// Serialized upload record, as returned by ingestion and lookups.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadResponse {
    pub id: i64,
    pub url: String,
    /// `upload://{code}.{ext}` reference for embedding in post content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    /// HTTP path resolving the short reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_path: Option<String>,
    pub original_filename: String,
    pub filesize: i64,
    pub human_filesize: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub sha1: String,
    pub secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_hours: Option<i32>,
}

impl UploadResponse {
    pub fn from_upload(upload: &Upload) -> Self {
        let extension = upload.extension.as_deref().unwrap_or_default();
        Self {
            id: upload.id,
            url: upload.url.clone(),
            short_url: short_url::short_url(&upload.sha1, extension),
            short_path: short_url::short_path(&upload.sha1, extension),
            original_filename: upload.original_filename.clone(),
            filesize: upload.filesize,
            human_filesize: humanize_bytes(upload.filesize.max(0) as u64),
            width: upload.width,
            height: upload.height,
            extension: upload.extension.clone(),
            sha1: upload.sha1.clone(),
            secure: upload.secure,
            retain_hours: upload.retain_hours,
        }
    }
}

/// Body of `POST /uploads/lookup-urls`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LookupUrlsRequest {
    /// Short references to resolve, in any accepted form
    /// (`upload://{code}.{ext}`, `{code}.{ext}`, bare `{code}`).
    #[validate(length(min = 1, message = "short_urls must not be empty"))]
    pub short_urls: Vec<String>,
}

/// One resolved short reference.
#[derive(Debug, Serialize, ToSchema)]
pub struct LookupUrlItem {
    pub short_url: String,
    /// Serving URL; secure uploads report their short path here so clients
    /// always go through the retrieval gate.
    pub url: String,
    pub short_path: String,
}

/// Body of `GET /uploads/metadata` responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadMetadataResponse {
    pub original_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub human_filesize: String,
}

impl UploadMetadataResponse {
    pub fn from_upload(upload: &Upload) -> Self {
        Self {
            original_filename: upload.original_filename.clone(),
            width: upload.width,
            height: upload.height,
            human_filesize: humanize_bytes(upload.filesize.max(0) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn upload() -> Upload {
        Upload {
            id: 7,
            user_id: Some(11),
            sha1: "a9993e364706816aba3e25717850c26c9cd0d89d".to_string(),
            original_filename: "logo.png".to_string(),
            filesize: 2048,
            width: Some(100),
            height: Some(80),
            extension: Some("png".to_string()),
            url: "/uploads/original/a9993e364706816aba3e25717850c26c9cd0d89d.png".to_string(),
            storage_key: "original/a9993e364706816aba3e25717850c26c9cd0d89d.png".to_string(),
            secure: false,
            access_control_post_id: None,
            retain_hours: None,
            upload_type: Some("composer".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn builds_short_references_from_record() {
        let response = UploadResponse::from_upload(&upload());
        let short_url = response.short_url.expect("short url");
        let short_path = response.short_path.expect("short path");

        assert!(short_url.starts_with("upload://"));
        assert!(short_url.ends_with(".png"));
        assert!(short_path.starts_with("/uploads/short-url/"));
        assert_eq!(response.human_filesize, "2 KB");
    }

    #[test]
    fn tolerates_missing_extension() {
        let mut record = upload();
        record.extension = None;
        let response = UploadResponse::from_upload(&record);

        let short_url = response.short_url.expect("short url");
        assert!(!short_url.ends_with('.'));
    }

    #[test]
    fn lookup_request_rejects_empty_list() {
        let request = LookupUrlsRequest { short_urls: vec![] };
        assert!(request.validate().is_err());

        let request = LookupUrlsRequest {
            short_urls: vec!["upload://abc.png".to_string()],
        };
        assert!(request.validate().is_ok());
    }
}
