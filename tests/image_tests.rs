// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image upload endpoint tests.
//!
//! The media service runs in offline mode here: uploads mint a URL of the
//! real shape without network traffic, so these tests exercise the size
//! cap, the folder placement, and the replace flow end to end.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;

mod common;

const FIVE_MIB: u64 = 5 * 1024 * 1024;

async fn post_image(body: serde_json::Value) -> Response {
    let (app, _) = common::create_test_app();
    let token = common::create_test_id_token("u1", "u1@example.com");

    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/profile/image")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn response_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_upload_lands_in_the_profile_images_folder() {
    let response = post_image(serde_json::json!({
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==",
        "size": 1024,
    }))
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    let url = json["url"].as_str().expect("url field");
    assert!(url.starts_with("https://"), "got {url}");
    assert!(url.contains("/profile_images/"), "got {url}");
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let response = post_image(serde_json::json!({
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==",
        "size": 6 * 1024 * 1024,
    }))
    .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json = response_json(response).await;
    assert_eq!(json["error"], "payload_too_large");
    assert_eq!(json["details"], "Image size must be less than 5 MB.");
}

#[tokio::test]
async fn test_size_cap_is_strictly_greater_than() {
    // Exactly at the cap passes
    let response = post_image(serde_json::json!({
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==",
        "size": FIVE_MIB,
    }))
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // One byte over does not
    let response = post_image(serde_json::json!({
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==",
        "size": FIVE_MIB + 1,
    }))
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_empty_image_is_a_bad_request() {
    let response = post_image(serde_json::json!({
        "image": "",
        "size": 0,
    }))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["details"], "No image uploaded");
}

#[tokio::test]
async fn test_replace_succeeds_even_when_the_old_url_is_junk() {
    // The delete step cannot make sense of this URL; the upload must
    // still go through
    let response = post_image(serde_json::json!({
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==",
        "size": 2048,
        "previous": "https://example.com/not-a-store-url.png",
    }))
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert!(json["url"].as_str().expect("url field").contains("/profile_images/"));
}

#[tokio::test]
async fn test_replace_with_a_store_url_also_uploads() {
    let response = post_image(serde_json::json!({
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==",
        "size": 2048,
        "previous": "https://res.cloudinary.com/mock/image/upload/v1/profile_images/old.png",
    }))
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_requires_a_session() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/profile/image")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({"image": "data:image/png;base64,AAAA", "size": 10})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
