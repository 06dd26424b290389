//! Upload ingestion.
//!
//! One orchestrator drives every ingestion path: stage the bytes into a
//! tempfile while hashing them, run the size gate, dedup on content hash,
//! commit to the backing store, and only then create the record. The staged
//! tempfile is deleted on success and failure alike because `NamedTempFile`
//! removes itself on drop.

use serde::Deserialize;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use updraft_core::{
    constants::UPLOAD_TYPE_MAX_LEN, hashing::ContentDigest, validation, AppError, Config,
    Requester, UploadPolicy, ValidationFailure,
};
use updraft_db::{NewUpload, Upload, UploadRepository};
use updraft_storage::{Store, UploadTarget};

/// Options accepted by `POST /uploads`, from query parameters or multipart
/// text fields (multipart wins).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IngestOptions {
    pub r#type: Option<String>,
    pub upload_type: Option<String>,
    /// Remote source, honored for API requesters only.
    pub url: Option<String>,
    pub pasted: Option<bool>,
    pub for_private_message: Option<bool>,
    pub for_site_setting: Option<bool>,
    pub retain_hours: Option<i32>,
}

impl IngestOptions {
    /// Merge a multipart text field into the options.
    pub fn set_field(&mut self, name: &str, value: &str) {
        match name {
            "type" => self.r#type = Some(value.to_string()),
            "upload_type" => self.upload_type = Some(value.to_string()),
            "url" => self.url = Some(value.to_string()),
            "pasted" => self.pasted = Some(truthy(value)),
            "for_private_message" => self.for_private_message = Some(truthy(value)),
            "for_site_setting" => self.for_site_setting = Some(truthy(value)),
            "retain_hours" => self.retain_hours = value.parse().ok(),
            _ => {}
        }
    }
}

fn truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

/// A fully staged source file: bytes on disk, hash and size computed.
pub struct StagedUpload {
    pub file: NamedTempFile,
    pub filename: String,
    pub size: u64,
    pub sha1: String,
}

/// Incrementally writes chunks to a tempfile while hashing them, so staging
/// and content addressing are a single pass over the stream.
pub struct StagedWriter {
    file: NamedTempFile,
    out: tokio::fs::File,
    digest: ContentDigest,
    size: u64,
}

impl StagedWriter {
    pub async fn new() -> Result<Self, AppError> {
        let file = NamedTempFile::new()?;
        let out = tokio::fs::File::create(file.path()).await?;
        Ok(Self {
            file,
            out,
            digest: ContentDigest::new(),
            size: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), AppError> {
        self.digest.update(chunk);
        self.size += chunk.len() as u64;
        self.out.write_all(chunk).await?;
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn finish(mut self, filename: String) -> Result<StagedUpload, AppError> {
        self.out.flush().await?;
        Ok(StagedUpload {
            file: self.file,
            filename,
            size: self.size,
            sha1: self.digest.finalize_hex(),
        })
    }
}

/// Orchestrates upload ingestion against the repository and the backing store.
#[derive(Clone)]
pub struct UploadIngestor {
    uploads: UploadRepository,
    store: Arc<dyn Store>,
    policy: UploadPolicy,
    config: Arc<Config>,
    http: reqwest::Client,
}

impl UploadIngestor {
    pub fn new(
        uploads: UploadRepository,
        store: Arc<dyn Store>,
        policy: UploadPolicy,
        config: Arc<Config>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            uploads,
            store,
            policy,
            config,
            http,
        }
    }

    /// Ingest one upload for the requester.
    ///
    /// `staged` carries the multipart file when one was posted; otherwise the
    /// `url` option is fetched for API requesters. Resolving no bytes at all
    /// is `FileMissing`.
    #[tracing::instrument(
        skip(self, staged, opts),
        fields(user_id = ?requester.user_id(), pasted = opts.pasted.unwrap_or(false))
    )]
    pub async fn ingest(
        &self,
        requester: Requester,
        staged: Option<StagedUpload>,
        opts: IngestOptions,
    ) -> Result<Upload, AppError> {
        let upload_type = normalize_type(opts.r#type.as_deref().or(opts.upload_type.as_deref()))?;

        if upload_type == "avatar" && !requester.can_upload_avatar(self.config.allow_uploaded_avatars)
        {
            return Err(ValidationFailure::single(
                "avatar",
                "Uploaded avatars are not allowed.",
            )
            .into());
        }

        let staged = match staged {
            Some(staged) => Some(staged),
            None => match opts.url.as_deref() {
                Some(url) if requester.can_ingest_from_url() => self.fetch_remote(url).await?,
                _ => None,
            },
        };
        let Some(staged) = staged else {
            return Err(AppError::FileMissing);
        };

        self.policy.validate(&staged.filename, staged.size)?;

        let retain_hours = opts
            .retain_hours
            .filter(|hours| *hours > 0)
            .filter(|_| requester.can_set_retain_hours());

        if let Some(mut existing) = self.uploads.find_by_sha1(&staged.sha1).await? {
            tracing::info!(
                sha1 = %staged.sha1,
                upload_id = existing.id,
                "Deduplicated upload against existing record"
            );
            if let Some(hours) = retain_hours {
                self.uploads
                    .update_retain_hours(existing.id, Some(hours))
                    .await?;
                existing.retain_hours = Some(hours);
            }
            return Ok(existing);
        }

        let extension = validation::extension(&staged.filename);
        let (width, height) = staged_dimensions(&staged);

        let secure = self.config.secure_uploads
            && opts.for_private_message.unwrap_or(false)
            && !opts.for_site_setting.unwrap_or(false);

        let content_type = mime_guess::from_path(&staged.filename)
            .first_or_octet_stream()
            .to_string();
        let target = UploadTarget {
            sha1: staged.sha1.clone(),
            extension: extension.clone(),
            content_type,
        };
        let stored = self.store.store(staged.file.path(), &target).await?;

        // The record is created strictly after the store commit; a concurrent
        // identical upload resolves to the winner's row inside create().
        let record = self
            .uploads
            .create(NewUpload {
                user_id: requester.user_id(),
                sha1: staged.sha1.clone(),
                original_filename: staged.filename.clone(),
                filesize: staged.size as i64,
                width,
                height,
                extension: (!extension.is_empty()).then_some(extension),
                url: stored.url,
                storage_key: stored.key,
                secure,
                access_control_post_id: None,
                retain_hours,
                upload_type: Some(upload_type),
            })
            .await?;

        tracing::info!(
            upload_id = record.id,
            sha1 = %record.sha1,
            size_bytes = staged.size,
            backend = %self.store.backend_type(),
            "Upload ingested"
        );
        Ok(record)
    }

    /// Fetch a remote URL into a staged file, hashing while downloading.
    ///
    /// Any failure (bad URL, unreachable host, error status, byte cap breach)
    /// is logged and resolves to `None`, which the caller reports as a
    /// missing file.
    async fn fetch_remote(&self, url: &str) -> Result<Option<StagedUpload>, AppError> {
        let parsed = match reqwest::Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => parsed,
            Ok(_) => {
                tracing::warn!(url = %url, "Refusing remote fetch from non-HTTP url");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Invalid remote fetch url");
                return Ok(None);
            }
        };

        let response = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let mut response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Remote fetch failed");
                return Ok(None);
            }
        };

        let cap = self.policy.max_ingest_size();
        let mut writer = StagedWriter::new().await?;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if writer.size() + chunk.len() as u64 > cap {
                        tracing::warn!(
                            url = %url,
                            cap_bytes = cap,
                            "Remote fetch exceeded the ingestion byte cap"
                        );
                        return Ok(None);
                    }
                    writer.write_chunk(&chunk).await?;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Remote fetch aborted mid-body");
                    return Ok(None);
                }
            }
        }

        let filename = filename_from_url(&parsed);
        Ok(Some(writer.finish(filename).await?))
    }
}

/// Read raster image dimensions from the staged file; failures are tolerated
/// because dimensions are advisory metadata.
fn staged_dimensions(staged: &StagedUpload) -> (Option<i32>, Option<i32>) {
    if !validation::is_supported_image(&staged.filename) {
        return (None, None);
    }
    match image::image_dimensions(staged.file.path()) {
        Ok((width, height)) => (Some(width as i32), Some(height as i32)),
        Err(e) => {
            tracing::debug!(
                filename = %staged.filename,
                error = %e,
                "Could not read image dimensions"
            );
            (None, None)
        }
    }
}

/// Normalize an upload classifier: lowercase, non-alphanumeric runs collapsed
/// to `_`, truncated. Missing or empty input is a parameter error.
fn normalize_type(raw: Option<&str>) -> Result<String, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::InvalidParameters("type or upload_type is required".to_string())
        })?;

    let mut slug = String::with_capacity(raw.len());
    for ch in raw.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.truncate(UPLOAD_TYPE_MAX_LEN);
    while slug.ends_with('_') {
        slug.pop();
    }

    if slug.is_empty() {
        return Err(AppError::InvalidParameters(format!(
            "invalid upload type: {raw}"
        )));
    }
    Ok(slug)
}

/// Filename for a remote fetch: the last URL path segment, or a placeholder.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "downloaded".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_classifier_strings() {
        assert_eq!(normalize_type(Some("composer")).unwrap(), "composer");
        assert_eq!(normalize_type(Some("My Avatar!")).unwrap(), "my_avatar");
        assert_eq!(
            normalize_type(Some("card  background")).unwrap(),
            "card_background"
        );
        assert_eq!(normalize_type(Some("--weird--")).unwrap(), "weird");
    }

    #[test]
    fn truncates_long_classifiers() {
        let long = "x".repeat(200);
        let slug = normalize_type(Some(&long)).unwrap();
        assert_eq!(slug.len(), UPLOAD_TYPE_MAX_LEN);
    }

    #[test]
    fn rejects_missing_or_unusable_classifiers() {
        assert!(matches!(
            normalize_type(None),
            Err(AppError::InvalidParameters(_))
        ));
        assert!(matches!(
            normalize_type(Some("   ")),
            Err(AppError::InvalidParameters(_))
        ));
        assert!(matches!(
            normalize_type(Some("!!!")),
            Err(AppError::InvalidParameters(_))
        ));
    }

    #[test]
    fn derives_filenames_from_urls() {
        let url = reqwest::Url::parse("https://example.com/images/cat.png?size=big").unwrap();
        assert_eq!(filename_from_url(&url), "cat.png");

        let url = reqwest::Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&url), "downloaded");
    }

    #[test]
    fn merges_multipart_text_fields() {
        let mut opts = IngestOptions::default();
        opts.set_field("type", "avatar");
        opts.set_field("for_private_message", "true");
        opts.set_field("retain_hours", "48");
        opts.set_field("unknown", "ignored");

        assert_eq!(opts.r#type.as_deref(), Some("avatar"));
        assert_eq!(opts.for_private_message, Some(true));
        assert_eq!(opts.retain_hours, Some(48));
    }

    #[tokio::test]
    async fn staged_writer_hashes_while_writing() {
        let mut writer = StagedWriter::new().await.unwrap();
        writer.write_chunk(b"abc").await.unwrap();
        writer.write_chunk(b"def").await.unwrap();
        let staged = writer.finish("note.txt".to_string()).await.unwrap();

        assert_eq!(staged.size, 6);
        assert_eq!(staged.sha1, updraft_core::hashing::sha1_hex(b"abcdef"));
        let on_disk = std::fs::read(staged.file.path()).unwrap();
        assert_eq!(on_disk, b"abcdef");
    }
}
