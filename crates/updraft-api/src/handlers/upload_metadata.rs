use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use updraft_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::models::UploadMetadataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub url: String,
}

/// Look up display metadata for an upload by its serving URL.
#[utoipa::path(
    get,
    path = "/uploads/metadata",
    tag = "uploads",
    params(
        ("url" = String, Query, description = "Serving URL of the upload")
    ),
    responses(
        (status = 200, description = "Upload metadata", body = UploadMetadataResponse),
        (status = 404, description = "No upload with that URL"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn upload_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetadataQuery>,
) -> Result<Json<UploadMetadataResponse>, HttpAppError> {
    let upload = state
        .uploads
        .find_by_url(&query.url)
        .await?
        .ok_or_else(|| AppError::NotFound(query.url.clone()))?;

    Ok(Json(UploadMetadataResponse::from_upload(&upload)))
}
