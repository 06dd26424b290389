use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use updraft_core::Requester;

/// Requester identity resolved by the middleware and stored in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct RequesterContext(pub Requester);

// Implement FromRequestParts for RequesterContext to work with Multipart.
// Extension cannot be used with Multipart, so we extract directly from request parts.
impl<S> FromRequestParts<S> for RequesterContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequesterContext>()
            .copied()
            .ok_or_else(|| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(
                        "Requester context missing from request",
                        "MISSING_REQUESTER_CONTEXT",
                    )),
                )
            })
    }
}
