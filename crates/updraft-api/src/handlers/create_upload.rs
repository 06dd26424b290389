use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use updraft_core::AppError;

use crate::auth::RequesterContext;
use crate::error::{ErrorResponse, FailedResponse, HttpAppError};
use crate::models::UploadResponse;
use crate::services::ingest::{IngestOptions, StagedUpload, StagedWriter};
use crate::state::AppState;

/// Create an upload from a multipart file or a remote URL.
///
/// Options arrive as query parameters or as multipart text fields; the
/// multipart value wins when both are present. The binary part is the first
/// field named `file` or `files[]`.
#[utoipa::path(
    post,
    path = "/uploads",
    tag = "uploads",
    params(
        ("type" = Option<String>, Query, description = "Upload classifier, e.g. 'composer' or 'avatar'"),
        ("upload_type" = Option<String>, Query, description = "Alias for 'type'"),
        ("url" = Option<String>, Query, description = "Remote URL to ingest (API requesters only)"),
        ("pasted" = Option<bool>, Query, description = "File was pasted into the composer"),
        ("for_private_message" = Option<bool>, Query, description = "Mark the upload as private-message bound"),
        ("for_site_setting" = Option<bool>, Query, description = "Upload backs a site setting"),
        ("retain_hours" = Option<i32>, Query, description = "Retention hint (admin only)")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload created or deduplicated", body = UploadResponse),
        (status = 400, description = "Missing or invalid parameters", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = FailedResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = ?requester.0.user_id()))]
pub async fn create_upload(
    State(state): State<Arc<AppState>>,
    requester: RequesterContext,
    Query(query): Query<IngestOptions>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let (staged, opts) = read_multipart(multipart, query).await?;
    let upload = state.ingestor.ingest(requester.0, staged, opts).await?;
    Ok(Json(UploadResponse::from_upload(&upload)))
}

/// Drain the multipart body: stage the first binary `file`/`files[]` field to
/// a tempfile and merge text fields over the query options.
async fn read_multipart(
    mut multipart: Multipart,
    mut opts: IngestOptions,
) -> Result<(Option<StagedUpload>, IngestOptions), AppError> {
    let mut staged = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidParameters(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" || field_name == "files[]" {
            if staged.is_some() {
                // only the first binary field counts
                continue;
            }
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "blob".to_string());

            let mut writer = StagedWriter::new().await?;
            while let Some(chunk) = field.chunk().await.map_err(|e| {
                AppError::InvalidParameters(format!("Failed to read file data: {}", e))
            })? {
                writer.write_chunk(&chunk).await?;
            }
            staged = Some(writer.finish(filename).await?);
        } else {
            let value = field.text().await.map_err(|e| {
                AppError::InvalidParameters(format!("Failed to read field '{}': {}", field_name, e))
            })?;
            opts.set_field(&field_name, &value);
        }
    }

    Ok((staged, opts))
}
