use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use updraft_core::{hashing, AppError, Requester};
use updraft_db::Upload;
use updraft_storage::Store;

use crate::auth::RequesterContext;
use crate::error::HttpAppError;
use crate::services::retrieval::{self, ServeOptions};
use crate::state::AppState;

/// Serve an upload by filename.
///
/// The basename minus its extension is either a full content hash or a
/// legacy numeric id; ids are verified against the exact request path so an
/// id cannot be replayed under a different filename.
#[utoipa::path(
    get,
    path = "/uploads/{name}",
    tag = "uploads",
    params(
        ("name" = String, Path, description = "`{sha1}.{ext}` or legacy `{id}.{ext}`"),
        ("inline" = Option<String>, Query, description = "Request inline disposition for renderable images"),
        ("dl" = Option<String>, Query, description = "`1` forces attachment disposition")
    ),
    responses(
        (status = 200, description = "Upload bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Request arrived via XHR"),
        (status = 403, description = "Requester cannot see the controlling post"),
        (status = 404, description = "Unknown upload")
    )
)]
#[tracing::instrument(skip(state, headers, opts), fields(user_id = ?requester.0.user_id()))]
pub async fn show_upload(
    State(state): State<Arc<AppState>>,
    requester: RequesterContext,
    Path(name): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(opts): Query<ServeOptions>,
) -> Result<Response, HttpAppError> {
    serve_by_name(&state, requester.0, &name, uri.path(), &headers, &opts).await
}

/// Serve an upload by filename under the `original/` prefix. Same resolution
/// as `show_upload`; old markup links both forms.
#[utoipa::path(
    get,
    path = "/uploads/original/{name}",
    tag = "uploads",
    params(
        ("name" = String, Path, description = "`{sha1}.{ext}` or legacy `{id}.{ext}`"),
        ("inline" = Option<String>, Query, description = "Request inline disposition for renderable images"),
        ("dl" = Option<String>, Query, description = "`1` forces attachment disposition")
    ),
    responses(
        (status = 200, description = "Upload bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Request arrived via XHR"),
        (status = 403, description = "Requester cannot see the controlling post"),
        (status = 404, description = "Unknown upload")
    )
)]
#[tracing::instrument(skip(state, headers, opts), fields(user_id = ?requester.0.user_id()))]
pub async fn show_original(
    State(state): State<Arc<AppState>>,
    requester: RequesterContext,
    Path(name): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(opts): Query<ServeOptions>,
) -> Result<Response, HttpAppError> {
    serve_by_name(&state, requester.0, &name, uri.path(), &headers, &opts).await
}

async fn serve_by_name(
    state: &AppState,
    requester: Requester,
    name: &str,
    request_path: &str,
    headers: &HeaderMap,
    opts: &ServeOptions,
) -> Result<Response, HttpAppError> {
    retrieval::deny_xhr(headers)?;

    if state.config.prevent_anons_from_downloading_files && !requester.is_signed_in() {
        return Err(AppError::NotFound(name.to_string()).into());
    }

    let upload = resolve_by_name(state, name, request_path)
        .await?
        .ok_or_else(|| AppError::NotFound(name.to_string()))?;

    // These routes stream from disk only. With a remote store active, serve
    // just what the local store still holds from before a migration.
    if !state.store.is_internal() && !state.local_store.has_been_stored(&upload.url) {
        return Err(AppError::NotFound(name.to_string()).into());
    }

    retrieval::check_secure_access(state.access.as_ref(), &requester, &upload).await?;

    Ok(retrieval::stream_local(&state.local_store, &upload, opts).await?)
}

async fn resolve_by_name(
    state: &AppState,
    name: &str,
    request_path: &str,
) -> Result<Option<Upload>, AppError> {
    let base = match name.rsplit_once('.') {
        Some((base, _ext)) => base,
        None => name,
    };

    if hashing::is_sha1_hex(base) {
        return state.uploads.find_by_sha1(base).await;
    }
    if let Ok(id) = base.parse::<i64>() {
        return state.uploads.find_by_id_and_url(id, request_path).await;
    }
    Ok(None)
}
