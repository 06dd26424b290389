//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Updraft API",
        version = "0.1.0",
        description = "Upload ingestion and secure-retrieval service. Accepts multipart or remote-URL uploads, deduplicates them by content hash against a pluggable backing store, and serves them back through direct streaming or access-controlled signed redirects."
    ),
    paths(
        handlers::create_upload::create_upload,
        handlers::lookup_urls::lookup_urls,
        handlers::upload_metadata::upload_metadata,
        handlers::show_upload::show_upload,
        handlers::show_upload::show_original,
        handlers::show_short_url::show_short_url,
        handlers::show_secure::show_secure,
        handlers::show_secure::show_secure_deprecated,
    ),
    components(
        schemas(
            models::UploadResponse,
            models::LookupUrlsRequest,
            models::LookupUrlItem,
            models::UploadMetadataResponse,
            error::ErrorResponse,
            error::FailedResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Upload ingestion, lookup, and retrieval operations")
    )
)]
pub struct ApiDoc;
