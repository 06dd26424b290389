//! Retrieval gate integration tests.
//!
//! Run with: `cargo test -p updraft-api --test retrieval_test`
//! No database required: every covered path concludes before the first query.

mod helpers;

use helpers::{setup_test_app, setup_test_app_with};

#[tokio::test]
async fn test_xhr_requests_are_denied() {
    let app = setup_test_app().await;
    let client = app.client();

    for path in [
        "/uploads/deadbeef.png",
        "/uploads/short-url/AbCdEf.png",
        "/secure-uploads/original/1X/abc.png",
    ] {
        let response = client
            .get(path)
            .add_header("X-Requested-With", "XMLHttpRequest")
            .await;

        assert_eq!(response.status_code(), 400, "path: {}", path);
        let data: serde_json::Value = response.json();
        assert_eq!(data["code"], "INVALID_PARAMETERS");
    }
}

#[tokio::test]
async fn test_unknown_upload_names_are_not_found() {
    let app = setup_test_app().await;
    let client = app.client();

    // Neither a content hash nor a numeric id
    let response = client.get("/uploads/not-a-hash.png").await;
    assert_eq!(response.status_code(), 404);
    assert!(response.text().is_empty());

    // The original/ prefix resolves the same way
    let response = client.get("/uploads/original/not-a-hash.png").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_short_url_codes_must_decode() {
    let app = setup_test_app().await;

    let response = app.client().get("/uploads/short-url/_invalid_.png").await;

    assert_eq!(response.status_code(), 404);
    assert!(response.text().is_empty());
}

#[tokio::test]
async fn test_secure_paths_need_a_content_hash() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get("/secure-uploads/original/1X/readme.txt").await;
    assert_eq!(response.status_code(), 404);
    assert!(response.text().is_empty());

    // Deprecated alias resolves the same way
    let response = client.get("/show-secure-uploads/original/1X/readme.txt").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_anonymous_downloads_can_be_blocked_site_wide() {
    let app = setup_test_app_with(|config| {
        config.prevent_anons_from_downloading_files = true;
    })
    .await;
    let client = app.client();

    // Well-formed names are refused before the record is even looked up
    let sha = "a9993e364706816aba3e25717850c26c9cd0d89d";
    let response = client.get(&format!("/uploads/{}.png", sha)).await;
    assert_eq!(response.status_code(), 404);
    assert!(response.text().is_empty());

    let response = client.get("/uploads/short-url/AbCdEf.png").await;
    assert_eq!(response.status_code(), 404);
}
