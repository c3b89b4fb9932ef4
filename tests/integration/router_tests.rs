//! Router tests that need no database or Redis
//!
//! The pool and Redis client are created lazily, so only requests rejected
//! before any I/O (routing, authentication, permissions, body parsing) are
//! exercised here.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use locallibrary_server::{
    api,
    config::AppConfig,
    models::user::{AccountType, UserClaims},
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

fn test_app() -> (Router, AppConfig) {
    let config = AppConfig::default();

    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("Failed to create lazy pool");
    let redis = RedisService::lazy(&config.redis.url).expect("Failed to create Redis client");

    let services = Services::new(
        Repository::new(pool),
        config.users.clone(),
        config.loans.clone(),
        &config.redis,
        Arc::new(redis),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(services),
    };

    (api::create_router(state), config)
}

fn token_for(account_type: AccountType, config: &AppConfig) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: "reader".to_string(),
        user_id: 42,
        account_type,
        rights: account_type.rights(),
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.users.jwt_secret)
    .expect("Failed to sign token")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app();

    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_root_redirects_to_catalog() {
    let (app, _) = test_app();

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/api/v1/catalog");
}

#[tokio::test]
async fn test_me_requires_token() {
    let (app, _) = test_app();

    let response = app
        .oneshot(Request::get("/api/v1/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_forged_token_rejected() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::get("/api/v1/catalog/mybooks")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_all_borrowed_forbidden_for_readers() {
    let (app, config) = test_app();
    let token = token_for(AccountType::Reader, &config);

    let response = app
        .oneshot(
            Request::get("/api/v1/catalog/borrowed")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_renew_forbidden_for_readers() {
    let (app, config) = test_app();
    let token = token_for(AccountType::Reader, &config);

    let response = app
        .oneshot(
            Request::post(format!(
                "/api/v1/catalog/bookinstances/{}/renew",
                uuid::Uuid::new_v4()
            ))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "renewal_date": "2030-01-01" }).to_string()))
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_book_requires_login() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::post("/api/v1/catalog/books")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "title": "Dune",
                        "summary": "Spice",
                        "isbn": "9780441013593",
                        "genre_ids": [1]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_book_forbidden_for_readers() {
    let (app, config) = test_app();
    let token = token_for(AccountType::Reader, &config);

    let response = app
        .oneshot(
            Request::post("/api/v1/catalog/books")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "title": "Dune",
                        "summary": "Spice",
                        "isbn": "9780441013593",
                        "genre_ids": [1]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_book_validates_isbn() {
    let (app, config) = test_app();
    let token = token_for(AccountType::Librarian, &config);

    let response = app
        .oneshot(
            Request::post("/api/v1/catalog/books")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "title": "Dune",
                        "summary": "Spice",
                        "isbn": "978-0441",
                        "genre_ids": [1]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["fields"]["isbn"].is_array());
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _) = test_app();

    let response = app
        .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "LocalLibrary API");
}

async fn post_renewal(body: Value) -> axum::response::Response {
    let (app, config) = test_app();
    let token = token_for(AccountType::Librarian, &config);

    app.oneshot(
        Request::post(format!(
            "/api/v1/catalog/bookinstances/{}/renew",
            uuid::Uuid::new_v4()
        ))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_renew_impossible_date_is_form_error() {
    let response = post_renewal(json!({ "renewal_date": "2024-02-30" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["fields"]["renewal_date"][0], "Enter a valid date.");
}

#[tokio::test]
async fn test_renew_text_date_is_form_error() {
    let response = post_renewal(json!({ "renewal_date": "tomorrow" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["fields"]["renewal_date"][0], "Enter a valid date.");
}

#[tokio::test]
async fn test_renew_missing_date_is_form_error() {
    let response = post_renewal(json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["fields"]["renewal_date"].is_array());
}
