// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end flows against the Firestore emulator.
//!
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test
//!
//! These cover the storage semantics the offline tests cannot reach:
//! user-document upserts, the one-profile-per-account rule, owner checks,
//! and the fixed-email rule on update.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;

mod common;

fn unique_uid(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

fn profile_body(email: &str) -> serde_json::Value {
    serde_json::json!({
        "display_name": "Ada Lovelace",
        "username": "ada",
        "email": email,
        "phone_number": "0123456789",
        "description": "Analyst and programmer with a strong interest in early computation.",
        "image": "https://res.cloudinary.com/demo/image/upload/profile_images/ada.png",
        "degree": "BSc",
        "field": "Mathematics",
        "institute": "University of London",
        "grade": "A",
        "start_date": "2018-09-01",
        "end_date": "2021-06-30",
    })
}

fn request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 16384).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_session_persistence_creates_then_touches_the_user_doc() {
    require_emulator!();
    let (app, state) = common::create_emulator_app().await;

    let uid = unique_uid("session");
    let email = format!("{uid}@example.com");
    let token = common::create_test_id_token(&uid, &email);
    let body = serde_json::json!({ "token": token, "refresh_token": "refresh-1" });

    // First session: the user document is created
    let response = app
        .clone()
        .oneshot(request("POST", "/auth/session", &token, body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("session_access_token=") && c.contains("HttpOnly")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("session_refresh_token=") && c.contains("HttpOnly")));

    let json = body_json(response).await;
    assert_eq!(json["uid"], uid.as_str());
    assert_eq!(json["is_new_user"], true);

    let created = state
        .db
        .get_user(&uid)
        .await
        .expect("user lookup")
        .expect("user doc should exist");
    assert_eq!(created.role, "user");
    assert_eq!(created.email.as_deref(), Some(email.as_str()));
    assert_eq!(created.created_at, created.last_login_at);

    // Second session with the same account: only the login time moves
    let response = app
        .oneshot(request("POST", "/auth/session", &token, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["is_new_user"], false);

    let touched = state
        .db
        .get_user(&uid)
        .await
        .expect("user lookup")
        .expect("user doc should exist");
    assert_eq!(touched.created_at, created.created_at);
    assert_eq!(touched.role, "user");
    assert!(touched.last_login_at >= created.last_login_at);
}

#[tokio::test]
async fn test_an_account_gets_exactly_one_profile() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;

    let uid = unique_uid("dup");
    let email = format!("{uid}@example.com");
    let token = common::create_test_id_token(&uid, &email);

    let response = app
        .clone()
        .oneshot(request("POST", "/profile", &token, profile_body(&email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["owner_id"], uid.as_str());
    assert_eq!(json["created_at"], json["updated_at"]);

    // Same account, second create
    let response = app
        .oneshot(request("POST", "/profile", &token, profile_body(&email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"], "conflict");
    assert_eq!(
        json["details"],
        "You already have a profile. You are not allowed to create a new one."
    );
}

#[tokio::test]
async fn test_get_own_profile_roundtrip() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;

    let uid = unique_uid("own");
    let email = format!("{uid}@example.com");
    let token = common::create_test_id_token(&uid, &email);

    // Nothing there yet
    let response = app.clone().oneshot(get("/profile", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["details"], "No profile exists for this account.");

    let response = app
        .clone()
        .oneshot(request("POST", "/profile", &token, profile_body(&email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;

    let response = app.oneshot(get("/profile", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["display_name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_other_accounts_see_the_same_not_found_as_missing_ids() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;

    let owner = unique_uid("owner");
    let owner_email = format!("{owner}@example.com");
    let owner_token = common::create_test_id_token(&owner, &owner_email);

    let response = app
        .clone()
        .oneshot(request("POST", "/profile", &owner_token, profile_body(&owner_email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile_id = body_json(response).await["id"]
        .as_str()
        .expect("profile id")
        .to_string();

    // The owner can address it by id
    let response = app
        .clone()
        .oneshot(get(&format!("/profile/{profile_id}"), &owner_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A different account gets NotFound, not Forbidden
    let intruder = common::create_test_id_token(&unique_uid("intruder"), "x@example.com");
    let response = app
        .clone()
        .oneshot(get(&format!("/profile/{profile_id}"), &intruder))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let foreign = body_json(response).await;

    // ...and it is byte-identical to the missing-id answer, so ids
    // cannot be probed
    let response = app
        .oneshot(get("/profile/no-such-record", &owner_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let missing = body_json(response).await;
    assert_eq!(foreign, missing);
    assert_eq!(missing["details"], "Profile not found.");
}

#[tokio::test]
async fn test_update_is_owner_only() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;

    let owner = unique_uid("edit");
    let owner_email = format!("{owner}@example.com");
    let owner_token = common::create_test_id_token(&owner, &owner_email);

    let response = app
        .clone()
        .oneshot(request("POST", "/profile", &owner_token, profile_body(&owner_email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile_id = body_json(response).await["id"]
        .as_str()
        .expect("profile id")
        .to_string();

    // Unlike reads, a blocked edit is explicit about the reason
    let intruder = common::create_test_id_token(&unique_uid("intruder"), "x@example.com");
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/profile/{profile_id}"),
            &intruder,
            profile_body(&owner_email),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["details"], "You do not have permission to edit this profile.");

    // Owner edit goes through and reports what happened
    let mut update = profile_body(&owner_email);
    update["username"] = serde_json::json!("ada-byron");
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/profile/{profile_id}"),
            &owner_token,
            update,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Profile updated successfully.");
    assert_eq!(json["profile"]["username"], "ada-byron");

    // Updating a record that does not exist is NotFound
    let response = app
        .oneshot(request(
            "PUT",
            "/profile/no-such-record",
            &owner_token,
            profile_body(&owner_email),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_email_is_fixed_at_creation() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;

    let uid = unique_uid("email");
    let email = format!("{uid}@example.com");
    let token = common::create_test_id_token(&uid, &email);

    let response = app
        .clone()
        .oneshot(request("POST", "/profile", &token, profile_body(&email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile_id = body_json(response).await["id"]
        .as_str()
        .expect("profile id")
        .to_string();

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/profile/{profile_id}"),
            &token,
            profile_body("changed@example.com"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["field"], "email");
    assert_eq!(
        json["details"],
        "Email cannot be changed after the profile is created"
    );
}
