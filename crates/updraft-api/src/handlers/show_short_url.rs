use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use updraft_core::AppError;
use updraft_storage::UrlOptions;

use crate::auth::RequesterContext;
use crate::error::HttpAppError;
use crate::services::retrieval::{self, ServeOptions};
use crate::state::AppState;

/// Serve an upload addressed by its base62 short code.
///
/// The extension on the filename is decorative; only the code resolves the
/// record. Secure uploads go through the signed-redirect flow, public ones
/// stream from an internal store or redirect to the store URL.
#[utoipa::path(
    get,
    path = "/uploads/short-url/{filename}",
    tag = "uploads",
    params(
        ("filename" = String, Path, description = "`{base62}.{ext}` short reference"),
        ("inline" = Option<String>, Query, description = "Request inline disposition for renderable images"),
        ("dl" = Option<String>, Query, description = "`1` forces attachment disposition")
    ),
    responses(
        (status = 200, description = "Upload bytes", content_type = "application/octet-stream"),
        (status = 307, description = "Redirect to the store URL"),
        (status = 400, description = "Request arrived via XHR"),
        (status = 403, description = "Requester cannot see the controlling post"),
        (status = 404, description = "Unknown short code")
    )
)]
#[tracing::instrument(skip(state, headers, opts), fields(user_id = ?requester.0.user_id()))]
pub async fn show_short_url(
    State(state): State<Arc<AppState>>,
    requester: RequesterContext,
    Path(filename): Path<String>,
    headers: HeaderMap,
    Query(opts): Query<ServeOptions>,
) -> Result<Response, HttpAppError> {
    retrieval::deny_xhr(&headers)?;

    if state.config.prevent_anons_from_downloading_files && !requester.0.is_signed_in() {
        return Err(AppError::NotFound(filename).into());
    }

    let code = filename.split('.').next().unwrap_or_default();
    let upload = state
        .uploads
        .find_by_short_code(code)
        .await?
        .ok_or_else(|| AppError::NotFound(filename.clone()))?;

    if upload.secure && state.config.secure_uploads {
        retrieval::check_secure_access(state.access.as_ref(), &requester.0, &upload).await?;

        let url = state
            .store
            .url_for(
                &retrieval::object_ref(&upload),
                &UrlOptions {
                    force_download: opts.force_download(),
                },
            )
            .await
            .map_err(AppError::from)?;
        return Ok(retrieval::secure_redirect_response(&url, &state.config)?);
    }

    if state.store.is_internal() {
        return Ok(retrieval::stream_local(&state.local_store, &upload, &opts).await?);
    }

    let url = state
        .store
        .url_for(
            &retrieval::object_ref(&upload),
            &UrlOptions {
                force_download: opts.force_download(),
            },
        )
        .await
        .map_err(AppError::from)?;
    Ok(Redirect::temporary(&url).into_response())
}
