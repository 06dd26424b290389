use std::sync::Arc;

use axum::{extract::State, Json};
use updraft_core::{short_url, AppError};
use validator::Validate;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::models::{LookupUrlItem, LookupUrlsRequest};
use crate::state::AppState;

/// Resolve a batch of `upload://` short references to their serving URLs.
///
/// Unresolvable references are silently omitted so stale post markup does not
/// fail the whole batch. Secure uploads report their short path as the URL,
/// which routes browsers back through the retrieval gate.
#[utoipa::path(
    post,
    path = "/uploads/lookup-urls",
    tag = "uploads",
    request_body = LookupUrlsRequest,
    responses(
        (status = 200, description = "Resolved references", body = [LookupUrlItem]),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn lookup_urls(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LookupUrlsRequest>,
) -> Result<Json<Vec<LookupUrlItem>>, HttpAppError> {
    payload.validate().map_err(AppError::from)?;

    let mut items = Vec::with_capacity(payload.short_urls.len());
    for reference in &payload.short_urls {
        let Some(code) = short_url::code_from_reference(reference) else {
            continue;
        };
        let Some(upload) = state.uploads.find_by_short_code(code).await? else {
            continue;
        };

        let extension = upload.extension.as_deref().unwrap_or("");
        let Some(canonical) = short_url::short_url(&upload.sha1, extension) else {
            continue;
        };
        let Some(short_path) = short_url::short_path(&upload.sha1, extension) else {
            continue;
        };

        let url = if upload.secure {
            short_path.clone()
        } else {
            upload.url.clone()
        };
        items.push(LookupUrlItem {
            short_url: canonical,
            url,
            short_path,
        });
    }

    Ok(Json(items))
}
