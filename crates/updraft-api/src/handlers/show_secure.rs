use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use updraft_core::{AppError, Requester};
use updraft_storage::SignedUrlOptions;

use crate::auth::RequesterContext;
use crate::error::HttpAppError;
use crate::services::retrieval::{self, ServeOptions};
use crate::state::AppState;

/// Serve a secure upload addressed by its store path.
///
/// The last path segment carries the content hash, so optimized-variant
/// paths resolve to the original record. With secure mode on, access is
/// checked and the exact requested path is signed; with secure mode off the
/// request falls back to a plain redirect so stale secure markup keeps
/// rendering until it is rewritten.
#[utoipa::path(
    get,
    path = "/secure-uploads/{path}",
    tag = "uploads",
    params(
        ("path" = String, Path, description = "Store path, e.g. `original/1X/{sha1}.{ext}`"),
        ("dl" = Option<String>, Query, description = "`1` forces attachment disposition")
    ),
    responses(
        (status = 307, description = "Redirect to a signed or public URL"),
        (status = 400, description = "Request arrived via XHR"),
        (status = 403, description = "Requester cannot see the controlling post"),
        (status = 404, description = "Path does not resolve to an upload")
    )
)]
#[tracing::instrument(skip(state, headers, opts), fields(user_id = ?requester.0.user_id()))]
pub async fn show_secure(
    State(state): State<Arc<AppState>>,
    requester: RequesterContext,
    Path(path): Path<String>,
    headers: HeaderMap,
    Query(opts): Query<ServeOptions>,
) -> Result<Response, HttpAppError> {
    serve_secure_path(&state, requester.0, &path, &headers, &opts).await
}

/// Deprecated route kept so pre-rename post HTML keeps resolving.
#[utoipa::path(
    get,
    path = "/show-secure-uploads/{path}",
    tag = "uploads",
    params(
        ("path" = String, Path, description = "Store path, e.g. `original/1X/{sha1}.{ext}`"),
        ("dl" = Option<String>, Query, description = "`1` forces attachment disposition")
    ),
    responses(
        (status = 307, description = "Redirect to a signed or public URL"),
        (status = 400, description = "Request arrived via XHR"),
        (status = 403, description = "Requester cannot see the controlling post"),
        (status = 404, description = "Path does not resolve to an upload")
    )
)]
#[tracing::instrument(skip(state, headers, opts), fields(user_id = ?requester.0.user_id()))]
pub async fn show_secure_deprecated(
    State(state): State<Arc<AppState>>,
    requester: RequesterContext,
    Path(path): Path<String>,
    headers: HeaderMap,
    Query(opts): Query<ServeOptions>,
) -> Result<Response, HttpAppError> {
    serve_secure_path(&state, requester.0, &path, &headers, &opts).await
}

async fn serve_secure_path(
    state: &AppState,
    requester: Requester,
    path: &str,
    headers: &HeaderMap,
    opts: &ServeOptions,
) -> Result<Response, HttpAppError> {
    retrieval::deny_xhr(headers)?;

    let sha1 = retrieval::sha1_from_secure_path(path)
        .ok_or_else(|| AppError::NotFound(path.to_string()))?;
    let upload = state
        .uploads
        .find_by_sha1(&sha1)
        .await?
        .ok_or_else(|| AppError::NotFound(path.to_string()))?;

    if state.config.prevent_anons_from_downloading_files && !requester.is_signed_in() {
        return Err(AppError::NotFound(path.to_string()).into());
    }

    if state.config.secure_uploads {
        retrieval::check_secure_access(state.access.as_ref(), &requester, &upload).await?;

        let url = state
            .store
            .signed_url_for_path(
                path,
                &SignedUrlOptions {
                    expires_in: Duration::from_secs(state.config.presigned_get_expires_seconds),
                    force_download: opts.force_download(),
                },
            )
            .await
            .map_err(AppError::from)?;
        return Ok(retrieval::secure_redirect_response(&url, &state.config)?);
    }

    // Secure mode was toggled off after this upload was recorded. A 404 here
    // would break every post still embedding the secure path, so redirect:
    // still-secure records get the requested path signed (the ACL is likely
    // still private), public ones the CDN URL.
    let url = if upload.secure {
        state
            .store
            .signed_url_for_path(
                path,
                &SignedUrlOptions {
                    expires_in: Duration::from_secs(state.config.presigned_get_expires_seconds),
                    force_download: false,
                },
            )
            .await
            .map_err(AppError::from)?
    } else {
        state.store.cdn_url(&upload.url)
    };
    Ok(Redirect::temporary(&url).into_response())
}
