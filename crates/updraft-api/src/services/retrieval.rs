//! Retrieval gate helpers shared by the serving handlers.
//!
//! Every serving endpoint walks the same sequence: reject XHR, resolve the
//! record, enforce the access rules for secure uploads, then either stream
//! the bytes (internal store) or redirect to the store's URL. The pieces of
//! that sequence live here so the handlers stay thin.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use updraft_core::{hashing, validation, AppError, Config, Requester};
use updraft_db::Upload;
use updraft_storage::{disposition, LocalStore, ObjectRef, Store};

use crate::access::AccessPolicy;

/// Query options shared by the serving endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ServeOptions {
    pub inline: Option<String>,
    pub dl: Option<String>,
}

impl ServeOptions {
    /// `dl=1` forces an attachment disposition regardless of content type.
    pub fn force_download(&self) -> bool {
        self.dl.as_deref() == Some("1")
    }

    pub fn inline_requested(&self) -> bool {
        self.inline.is_some()
    }
}

/// Serving endpoints are navigation targets. Requests marked as XHR get a
/// parameter error before any lookup happens.
pub fn deny_xhr(headers: &HeaderMap) -> Result<(), AppError> {
    let via_xhr = headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false);
    if via_xhr {
        return Err(AppError::InvalidParameters(
            "XHR requests are not allowed".to_string(),
        ));
    }
    Ok(())
}

/// Enforce the access rules for a secure upload.
///
/// An upload bound to a post defers to the access policy; failing that check
/// is a hard 403. A secure upload bound to nothing is served to signed-in
/// requesters only, and hidden (404, not 403) from everyone else.
pub async fn check_secure_access(
    access: &dyn AccessPolicy,
    requester: &Requester,
    upload: &Upload,
) -> Result<(), AppError> {
    match upload.access_control_post_id {
        Some(post_id) => {
            if !access.can_see_post(requester, post_id).await? {
                return Err(AppError::InvalidAccess(format!(
                    "upload {} is not visible to this requester",
                    upload.id
                )));
            }
        }
        None => {
            if upload.secure && !requester.is_signed_in() {
                return Err(AppError::NotFound(format!("upload {}", upload.id)));
            }
        }
    }
    Ok(())
}

/// Redirect to a signed URL. The cache lifetime stays inside the signature
/// lifetime so a cached redirect can never outlive its target.
pub fn secure_redirect_response(url: &str, config: &Config) -> Result<Response, AppError> {
    let cache_control = HeaderValue::from_str(&format!(
        "private, max-age={}",
        config.secure_redirect_cache_seconds()
    ))
    .map_err(|e| AppError::Internal(format!("Invalid cache-control header: {}", e)))?;

    let mut response = Redirect::temporary(url).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, cache_control);
    Ok(response)
}

/// Disposition for a served file: inline only when the requester asked for it,
/// the type renders in browsers, and nothing forces a download.
pub fn content_disposition(
    filename: &str,
    inline_requested: bool,
    force_download: bool,
) -> String {
    if !force_download && inline_requested && validation::is_inline_image(filename) {
        disposition::inline(filename)
    } else {
        disposition::attachment(filename)
    }
}

/// Store reference for a recorded upload.
pub fn object_ref(upload: &Upload) -> ObjectRef {
    ObjectRef {
        key: upload.storage_key.clone(),
        url: upload.url.clone(),
        filename: upload.original_filename.clone(),
        secure: upload.secure,
    }
}

/// Stream an upload's bytes from the local filesystem.
pub async fn stream_local(
    local_store: &LocalStore,
    upload: &Upload,
    opts: &ServeOptions,
) -> Result<Response, AppError> {
    let path = local_store
        .path_for(&upload.storage_key)
        .ok_or_else(|| AppError::NotFound(upload.storage_key.clone()))?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::warn!(error = %e, storage_key = %upload.storage_key, "Stored file missing on disk");
        AppError::NotFound(upload.storage_key.clone())
    })?;
    let length = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("Could not stat stored file: {}", e)))?
        .len();

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(
                &upload.original_filename,
                opts.inline_requested(),
                opts.force_download(),
            ),
        )
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(body)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string())
        })
}

/// Pull the content hash out of a secure-upload path.
///
/// The last path segment carries the hash as its leading `_`-delimited token,
/// so both `{sha1}.{ext}` and optimized variants like `{sha1}_2_100x100.{ext}`
/// resolve to the original record.
pub fn sha1_from_secure_path(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let base = match segment.rsplit_once('.') {
        Some((base, _ext)) => base,
        None => segment,
    };
    let candidate = base.split('_').next()?;
    hashing::is_sha1_hex(candidate).then(|| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::testing::StaticAccessPolicy;
    use updraft_core::UserContext;

    const SHA: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    fn upload(secure: bool, access_control_post_id: Option<i64>) -> Upload {
        let now = chrono::Utc::now();
        Upload {
            id: 42,
            user_id: Some(7),
            sha1: SHA.to_string(),
            original_filename: "photo.png".to_string(),
            filesize: 2048,
            width: Some(100),
            height: Some(80),
            extension: Some("png".to_string()),
            url: format!("/uploads/original/{SHA}.png"),
            storage_key: format!("original/{SHA}.png"),
            secure,
            access_control_post_id,
            retain_hours: None,
            upload_type: Some("composer".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn member() -> Requester {
        Requester::User(UserContext {
            user_id: Some(7),
            admin: false,
            via_api: false,
        })
    }

    #[test]
    fn extracts_sha1_from_secure_paths() {
        assert_eq!(
            sha1_from_secure_path(&format!("original/1X/{SHA}.png")).as_deref(),
            Some(SHA)
        );
        assert_eq!(
            sha1_from_secure_path(&format!("optimized/1X/{SHA}_2_100x100.png")).as_deref(),
            Some(SHA)
        );
        assert_eq!(sha1_from_secure_path(&format!("{SHA}")).as_deref(), Some(SHA));
    }

    #[test]
    fn rejects_paths_without_a_hash() {
        assert_eq!(sha1_from_secure_path("original/1X/readme.txt"), None);
        assert_eq!(sha1_from_secure_path(""), None);
        assert_eq!(sha1_from_secure_path("original/1X/"), None);
    }

    #[test]
    fn disposition_is_inline_only_for_renderable_requests() {
        assert!(content_disposition("photo.png", true, false).starts_with("inline"));
        assert!(content_disposition("photo.png", false, false).starts_with("attachment"));
        assert!(content_disposition("photo.png", true, true).starts_with("attachment"));
        assert!(content_disposition("report.pdf", true, false).starts_with("attachment"));
        // svg renders in browsers but is never served inline
        assert!(content_disposition("logo.svg", true, false).starts_with("attachment"));
    }

    #[test]
    fn force_download_reads_the_dl_flag() {
        let opts = ServeOptions {
            inline: None,
            dl: Some("1".to_string()),
        };
        assert!(opts.force_download());

        let opts = ServeOptions {
            inline: Some("1".to_string()),
            dl: Some("0".to_string()),
        };
        assert!(!opts.force_download());
        assert!(opts.inline_requested());
    }

    #[test]
    fn xhr_requests_are_denied() {
        let mut headers = HeaderMap::new();
        assert!(deny_xhr(&headers).is_ok());

        headers.insert("x-requested-with", "XMLHttpRequest".parse().unwrap());
        assert!(matches!(
            deny_xhr(&headers),
            Err(AppError::InvalidParameters(_))
        ));

        headers.insert("x-requested-with", "fetch".parse().unwrap());
        assert!(deny_xhr(&headers).is_ok());
    }

    fn test_config() -> Config {
        Config {
            server_port: 3000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            database_url: "postgresql://localhost/updraft_test".to_string(),
            db_max_connections: 10,
            db_timeout_seconds: 30,
            api_key: None,
            storage_backend: updraft_core::StoreBackend::Local,
            local_storage_path: "./uploads".to_string(),
            local_storage_base_url: "/uploads".to_string(),
            s3_bucket: None,
            s3_region: None,
            aws_region: None,
            s3_endpoint: None,
            s3_cdn_url: None,
            max_attachment_size_kb: 4096,
            max_image_size_kb: 10_240,
            secure_uploads: false,
            prevent_anons_from_downloading_files: false,
            presigned_get_expires_seconds: 300,
            allow_uploaded_avatars: true,
            access_policy_url: None,
            url_fetch_timeout_secs: 30,
        }
    }

    #[tokio::test]
    async fn post_bound_uploads_defer_to_the_access_policy() {
        let target = upload(true, Some(99));

        let allow = StaticAccessPolicy(true);
        assert!(check_secure_access(&allow, &member(), &target).await.is_ok());

        let deny = StaticAccessPolicy(false);
        assert!(matches!(
            check_secure_access(&deny, &member(), &target).await,
            Err(AppError::InvalidAccess(_))
        ));
        // the policy answer wins even for anonymous requesters
        assert!(matches!(
            check_secure_access(&deny, &Requester::Anonymous, &target).await,
            Err(AppError::InvalidAccess(_))
        ));
    }

    #[tokio::test]
    async fn unbound_secure_uploads_are_hidden_from_anonymous() {
        let target = upload(true, None);
        let policy = StaticAccessPolicy(false);

        assert!(matches!(
            check_secure_access(&policy, &Requester::Anonymous, &target).await,
            Err(AppError::NotFound(_))
        ));
        assert!(check_secure_access(&policy, &member(), &target)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn public_unbound_uploads_pass_the_gate() {
        let target = upload(false, None);
        let policy = StaticAccessPolicy(false);
        assert!(
            check_secure_access(&policy, &Requester::Anonymous, &target)
                .await
                .is_ok()
        );
    }

    #[test]
    fn secure_redirect_sets_a_private_cache_window() {
        let config = test_config();
        let response = secure_redirect_response("https://cdn.example.com/x", &config).unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "private, max-age=295"
        );
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://cdn.example.com/x"
        );
    }
}
