//! Requester resolution.
//!
//! Identity arrives from the fronting forum, not from a session of our own:
//! `Api-Key` marks service-to-service calls (compared in constant time against
//! the configured key), and the trusted `X-Forum-User-Id` / `X-Forum-Admin`
//! headers carry the acting user. Absence of both means anonymous. Every
//! request gets a [`RequesterContext`] in its extensions, so retrieval routes
//! can serve anonymous traffic.

use crate::auth::models::RequesterContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use updraft_core::{AppError, Requester, UserContext};

/// State for the requester middleware.
#[derive(Clone)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Resolve the requester from headers. A presented `Api-Key` that does not
/// match the configured key is rejected outright.
fn requester_from_headers(
    headers: &HeaderMap,
    expected_api_key: Option<&str>,
) -> Result<Requester, AppError> {
    let presented = headers.get("Api-Key").and_then(|h| h.to_str().ok());
    let via_api = match (presented, expected_api_key) {
        (Some(given), Some(expected)) if secure_compare(given, expected) => true,
        (Some(_), _) => {
            return Err(AppError::InvalidAccess("invalid API key".to_string()));
        }
        (None, _) => false,
    };

    let user_id = headers
        .get("X-Forum-User-Id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok());
    let admin = headers
        .get("X-Forum-Admin")
        .and_then(|h| h.to_str().ok())
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Admin requires an identified user; an API key alone acts as a
    // non-admin service account.
    let requester = match user_id {
        Some(id) => Requester::User(UserContext {
            user_id: Some(id),
            admin,
            via_api,
        }),
        None if via_api => Requester::User(UserContext {
            user_id: None,
            admin: false,
            via_api: true,
        }),
        None => Requester::Anonymous,
    };
    Ok(requester)
}

pub async fn requester_middleware(
    State(auth): State<Arc<AuthConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let requester = match requester_from_headers(request.headers(), auth.api_key.as_deref()) {
        Ok(requester) => requester,
        Err(err) => return HttpAppError(err).into_response(),
    };

    request.extensions_mut().insert(RequesterContext(requester));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn no_headers_is_anonymous() {
        let requester = requester_from_headers(&headers(&[]), None).unwrap();
        assert!(matches!(requester, Requester::Anonymous));
    }

    #[test]
    fn forum_headers_resolve_a_user() {
        let requester = requester_from_headers(
            &headers(&[("X-Forum-User-Id", "42"), ("X-Forum-Admin", "1")]),
            None,
        )
        .unwrap();
        assert_eq!(requester.user_id(), Some(42));
        assert!(requester.is_admin());
        assert!(!requester.is_api());
    }

    #[test]
    fn matching_api_key_marks_the_requester() {
        let requester =
            requester_from_headers(&headers(&[("Api-Key", "sekrit")]), Some("sekrit")).unwrap();
        assert!(requester.is_api());
        assert!(!requester.is_admin());
    }

    #[test]
    fn wrong_api_key_is_rejected() {
        let result = requester_from_headers(&headers(&[("Api-Key", "nope")]), Some("sekrit"));
        assert!(matches!(result, Err(AppError::InvalidAccess(_))));

        // A presented key with none configured is also rejected.
        let result = requester_from_headers(&headers(&[("Api-Key", "nope")]), None);
        assert!(matches!(result, Err(AppError::InvalidAccess(_))));
    }

    #[test]
    fn secure_compare_requires_equal_strings() {
        assert!(secure_compare("abc", "abc"));
        assert!(!secure_compare("abc", "abd"));
        assert!(!secure_compare("abc", "abcd"));
    }
}
