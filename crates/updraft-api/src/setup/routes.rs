//! Route configuration and setup

use crate::auth::AuthConfig;
use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use updraft_core::Config;

/// Multipart framing overhead allowed on top of the largest permitted file.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_config = Arc::new(AuthConfig {
        api_key: config.api_key.clone(),
    });

    // Probe and docs routes stay outside the requester middleware
    let public_routes = public_routes(state.clone());

    let upload_routes = upload_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(auth_config, crate::auth::requester_middleware),
    );

    let app_state_routes = public_routes.merge(upload_routes);

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let body_limit = config
        .max_attachment_size_bytes()
        .max(config.max_image_size_bytes())
        + MULTIPART_OVERHEAD_BYTES;

    let app = app_state_routes
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit as usize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no requester resolution required)
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(liveness_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .with_state(state)
}

/// Upload routes (requester context resolved by middleware).
fn upload_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads", post(handlers::create_upload::create_upload))
        .route(
            "/uploads/lookup-urls",
            post(handlers::lookup_urls::lookup_urls),
        )
        .route(
            "/uploads/metadata",
            get(handlers::upload_metadata::upload_metadata),
        )
        .route(
            "/uploads/short-url/{filename}",
            get(handlers::show_short_url::show_short_url),
        )
        .route(
            "/uploads/original/{name}",
            get(handlers::show_upload::show_original),
        )
        .route("/uploads/{name}", get(handlers::show_upload::show_upload))
        .route(
            "/secure-uploads/{*path}",
            get(handlers::show_secure::show_secure),
        )
        .route(
            "/show-secure-uploads/{*path}",
            get(handlers::show_secure::show_secure_deprecated),
        )
        .with_state(state)
}

/// Liveness probe - simple check that process is running
/// Always returns 200 if process can respond
async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive"
        })),
    )
}
