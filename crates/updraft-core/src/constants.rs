//! Shared constants for the upload pipeline.

/// Subtracted from the presigned-URL lifetime when setting the client cache
/// window on secure redirects, so a cached redirect never outlives the URL
/// it points at.
pub const SECURE_REDIRECT_GRACE_SECONDS: u64 = 5;

/// Upload classifier strings are slug-normalized and truncated to this length.
pub const UPLOAD_TYPE_MAX_LEN: usize = 50;

/// URL scheme used for short upload references embedded in post content.
pub const SHORT_URL_SCHEME: &str = "upload://";

/// Path prefix that serves short upload references over HTTP.
pub const SHORT_URL_PATH_PREFIX: &str = "/uploads/short-url/";
