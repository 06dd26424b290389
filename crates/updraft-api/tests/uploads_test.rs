//! Upload API integration tests.
//!
//! Run with: `cargo test -p updraft-api --test uploads_test`
//! No database required: every covered path concludes before the first query.

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use helpers::{setup_test_app, setup_test_app_with};

/// A minimal 1x1 PNG, enough to pass as a real file payload.
fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 dimensions
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49,
        0x44, 0x41, 0x54, // IDAT chunk
        0x08, 0xD7, 0x63, 0xF8, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x18, 0xDD,
        0x8D, 0x89, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60,
        0x82, // IEND chunk
    ]
}

fn png_form() -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(tiny_png())
            .file_name("pixel.png")
            .mime_type("image/png"),
    )
}

#[tokio::test]
async fn test_healthz_reports_alive() {
    let app = setup_test_app().await;

    let response = app.client().get("/healthz").await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["status"], "alive");
}

#[tokio::test]
async fn test_openapi_spec_lists_upload_routes() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert!(data["openapi"].is_string());
    assert!(data["paths"]["/uploads"].is_object());
    assert!(data["paths"]["/uploads/lookup-urls"].is_object());
    assert!(data["paths"]["/uploads/short-url/{filename}"].is_object());
}

#[tokio::test]
async fn test_upload_without_a_type_is_rejected() {
    let app = setup_test_app().await;

    let response = app.client().post("/uploads").multipart(png_form()).await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn test_avatar_uploads_respect_the_site_setting() {
    let app = setup_test_app_with(|config| {
        config.allow_uploaded_avatars = false;
    })
    .await;

    let response = app
        .client()
        .post("/uploads?type=avatar")
        .add_header("X-Forum-User-Id", "7")
        .multipart(png_form())
        .await;

    assert_eq!(response.status_code(), 422);
    let data: serde_json::Value = response.json();
    assert_eq!(
        data["errors"],
        serde_json::json!(["Uploaded avatars are not allowed."])
    );
}

#[tokio::test]
async fn test_lookup_urls_skips_unresolvable_references() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/uploads/lookup-urls")
        .json(&serde_json::json!({
            "short_urls": ["upload://!!!invalid.png", "not-a-short-url"]
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data, serde_json::json!([]));
}

#[tokio::test]
async fn test_lookup_urls_requires_references() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/uploads/lookup-urls")
        .json(&serde_json::json!({ "short_urls": [] }))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn test_malformed_json_bodies_get_the_error_envelope() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/uploads/lookup-urls")
        .content_type("application/json")
        .bytes("not json".into())
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn test_a_presented_api_key_must_match() {
    let app = setup_test_app_with(|config| {
        config.api_key = Some("sekrit".to_string());
    })
    .await;
    let client = app.client();

    let response = client
        .get("/uploads/metadata?url=upload://abc.png")
        .add_header("Api-Key", "wrong")
        .await;

    assert_eq!(response.status_code(), 403);
    assert!(response.text().is_empty());

    // The matching key clears the middleware; this name then fails resolution.
    let response = client
        .get("/uploads/not-a-hash.png")
        .add_header("Api-Key", "sekrit")
        .await;

    assert_eq!(response.status_code(), 404);
}
