//! Upload validation gate.
//!
//! Size policy applied before any bytes are committed to storage. Attachments
//! are checked against the configured ceiling up front; images are exempt
//! from the pre-check because downstream processing may shrink them, so their
//! final size is the stored size.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::Config;

const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "avif", "ico", "svg"];

/// Outcome of a failed validation: field name to ordered violation messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationFailure {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut failure = Self::default();
        failure.add(field, message);
        failure
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// All messages, flattened in field order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

impl std::error::Error for ValidationFailure {}

/// Lowercased extension of a filename, empty when there is none.
pub fn extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Whether the filename names a recognized image type.
pub fn is_supported_image(file_name: &str) -> bool {
    SUPPORTED_IMAGE_EXTENSIONS.contains(&extension(file_name).as_str())
}

/// Whether the filename names an image type browsers render inline.
/// SVG is excluded: it is scriptable and never served inline.
pub fn is_inline_image(file_name: &str) -> bool {
    let ext = extension(file_name);
    ext != "svg" && SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Size policy for incoming uploads.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_attachment_size_bytes: u64,
    pub max_image_size_bytes: u64,
}

impl UploadPolicy {
    pub fn new(max_attachment_size_bytes: u64, max_image_size_bytes: u64) -> Self {
        Self {
            max_attachment_size_bytes,
            max_image_size_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_attachment_size_bytes(),
            config.max_image_size_bytes(),
        )
    }

    /// Validate a staged file before it is committed to storage.
    pub fn validate(&self, file_name: &str, file_size: u64) -> Result<(), ValidationFailure> {
        if file_size == 0 {
            return Err(ValidationFailure::single(
                "file",
                "Sorry, the file you are trying to upload is empty.",
            ));
        }

        if !is_supported_image(file_name) && file_size >= self.max_attachment_size_bytes {
            return Err(ValidationFailure::single(
                "file",
                format!(
                    "Sorry, the file you are trying to upload is too big (maximum size is {}).",
                    humanize_bytes(self.max_attachment_size_bytes)
                ),
            ));
        }

        Ok(())
    }

    /// Byte cap for remote-URL ingestion.
    pub fn max_ingest_size(&self) -> u64 {
        self.max_attachment_size_bytes.max(self.max_image_size_bytes)
    }
}

/// Human-readable byte count, e.g. `4 MB` or `1.5 KB`.
pub fn humanize_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value.fract() == 0.0 {
        format!("{} {}", value as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
