//! Shared key generation for storage backends.
//!
//! Key format: `original/{sha1}.{extension}`, or `original/{sha1}` when the
//! upload carries no extension.

/// Generate the storage key for an original upload.
///
/// All backends must use this format for consistency.
pub(crate) fn original_key(sha1: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("original/{}", sha1)
    } else {
        format!("original/{}.{}", sha1, extension)
    }
}
