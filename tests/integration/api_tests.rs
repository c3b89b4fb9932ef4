//! API integration tests against a running server
//!
//! Expects a server on localhost:8080 started with
//! `LOCALLIBRARY__USERS__BOOTSTRAP_ADMIN_PASSWORD` set to the admin password below.

use chrono::{Duration, Utc};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_password() -> String {
    std::env::var("LOCALLIBRARY_TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "adminadmin".to_string())
}

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Create a reader account through the users API; returns its id and token
async fn create_reader(client: &Client, admin_token: &str) -> (i64, String) {
    let username = format!("reader_{}", unique_suffix());
    let password = "readerpass";

    let response = client
        .post(format!("{}/users", BASE_URL))
        .bearer_auth(admin_token)
        .json(&json!({
            "username": username,
            "password": password,
            "account_type": "reader"
        }))
        .send()
        .await
        .expect("Failed to create reader");
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = response.json().await.expect("Failed to parse user");

    let login: Value = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
        .json()
        .await
        .expect("Failed to parse login response");

    (
        user["id"].as_i64().expect("No user id"),
        login["token"].as_str().expect("No token in response").to_string(),
    )
}

async fn borrow_copy(client: &Client, token: &str, copy_id: &str, borrower_id: i64) -> Response {
    client
        .post(format!("{}/catalog/bookinstances/{}/borrow", BASE_URL, copy_id))
        .bearer_auth(token)
        .json(&json!({ "borrower_id": borrower_id }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn my_copy_ids(client: &Client, token: &str) -> Vec<String> {
    let body: Value = client
        .get(format!("{}/catalog/mybooks?per_page=100", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["items"]
        .as_array()
        .expect("No items")
        .iter()
        .filter_map(|i| i["id"].as_str().map(str::to_string))
        .collect()
}

fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Unique 13-digit ISBN
fn unique_isbn() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 10_000_000_000_000;
    format!("{:013}", n)
}

/// Create author, book and an available copy; returns the copy id
async fn create_available_copy(client: &Client, token: &str) -> String {
    create_copy(client, token, "a").await
}

/// Create author, book and a copy in `status`; returns the copy id
async fn create_copy(client: &Client, token: &str, status: &str) -> String {
    let author: Value = client
        .post(format!("{}/catalog/authors", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "first_name": "Ursula", "last_name": format!("Le Guin {}", unique_suffix()) }))
        .send()
        .await
        .expect("Failed to create author")
        .json()
        .await
        .expect("Failed to parse author");

    let genre: Value = client
        .post(format!("{}/catalog/genres", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "name": format!("Fantasy {}", unique_suffix()) }))
        .send()
        .await
        .expect("Failed to create genre")
        .json()
        .await
        .expect("Failed to parse genre");

    let book: Value = client
        .post(format!("{}/catalog/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "A Wizard of Earthsea",
            "author_id": author["id"],
            "summary": "A young wizard on Gont.",
            "isbn": unique_isbn(),
            "genre_ids": [genre["id"]]
        }))
        .send()
        .await
        .expect("Failed to create book")
        .json()
        .await
        .expect("Failed to parse book");

    let copy: Value = client
        .post(format!("{}/catalog/bookinstances", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "book_id": book["id"],
            "imprint": "Parnassus, 1968",
            "status": status
        }))
        .send()
        .await
        .expect("Failed to create copy")
        .json()
        .await
        .expect("Failed to parse copy");

    copy["id"].as_str().expect("No copy id").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["can_mark_returned"], true);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_catalog_home_counts_visits() {
    let client = Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client");

    let first: Value = client
        .get(format!("{}/catalog", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(first["num_visits"], 0);
    assert!(first["num_books"].is_i64());

    let second: Value = client
        .get(format!("{}/catalog", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(second["num_visits"], 1);

    // Logout clears the counter
    let response = client
        .post(format!("{}/auth/logout", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let third: Value = client
        .get(format!("{}/catalog", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(third["num_visits"], 0);
}

#[tokio::test]
#[ignore]
async fn test_list_books_paginated() {
    let client = Client::new();

    let response = client
        .get(format!("{}/catalog/books?page=1&per_page=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["items"].as_array().unwrap().len() <= 5);
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_create_book_requires_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/catalog/books", BASE_URL))
        .json(&json!({ "title": "x", "summary": "x", "isbn": "9780000000000", "genre_ids": [1] }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_bad_isbn() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/catalog/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "title": "x", "summary": "x", "isbn": "12345", "genre_ids": [1] }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["fields"]["isbn"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_loan_workflow() {
    let client = Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("Failed to build client");
    let token = get_auth_token(&client).await;
    let copy_id = create_available_copy(&client, &token).await;

    let me: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    // Borrow
    let lent: Value = client
        .post(format!("{}/catalog/bookinstances/{}/borrow", BASE_URL, copy_id))
        .bearer_auth(&token)
        .json(&json!({ "borrower_id": me["id"] }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(lent["status"], "o");
    assert_eq!(lent["is_overdue"], false);

    // Renewal form proposes three weeks from today
    let proposal: Value = client
        .get(format!("{}/catalog/bookinstances/{}/renew", BASE_URL, copy_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let today = Utc::now().date_naive();
    assert_eq!(
        proposal["proposed_renewal_date"],
        (today + Duration::weeks(3)).to_string()
    );

    // Past date rejected
    let response = client
        .post(format!("{}/catalog/bookinstances/{}/renew", BASE_URL, copy_id))
        .bearer_auth(&token)
        .json(&json!({ "renewal_date": (today - Duration::days(1)).to_string() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["fields"]["renewal_date"][0], "Invalid date - renewal in past");

    // Valid date redirects to the borrowed list
    let response = client
        .post(format!("{}/catalog/bookinstances/{}/renew", BASE_URL, copy_id))
        .bearer_auth(&token)
        .json(&json!({ "renewal_date": (today + Duration::weeks(2)).to_string() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()["location"],
        "/api/v1/catalog/borrowed"
    );

    let mine: Value = client
        .get(format!("{}/catalog/mybooks", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(mine["items"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"] == copy_id.as_str()));

    // Return
    let returned: Value = client
        .post(format!("{}/catalog/bookinstances/{}/return", BASE_URL, copy_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(returned["status"], "a");
    assert!(returned["due_back"].is_null());

    // A second return is a business rule violation
    let response = client
        .post(format!("{}/catalog/bookinstances/{}/return", BASE_URL, copy_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_renew_unknown_copy_is_not_found() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!(
            "{}/catalog/bookinstances/{}/renew",
            BASE_URL,
            uuid::Uuid::new_v4()
        ))
        .bearer_auth(&token)
        .json(&json!({ "renewal_date": "2000-01-01" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_my_books_only_lists_own_loans() {
    let client = Client::new();
    let admin = get_auth_token(&client).await;
    let (alice_id, alice) = create_reader(&client, &admin).await;
    let (bob_id, _) = create_reader(&client, &admin).await;

    let alice_copy = create_available_copy(&client, &admin).await;
    let bob_copy = create_available_copy(&client, &admin).await;
    let returned_copy = create_available_copy(&client, &admin).await;
    let maintenance_copy = create_available_copy(&client, &admin).await;

    for copy in [&alice_copy, &returned_copy, &maintenance_copy] {
        let response = borrow_copy(&client, &admin, copy, alice_id).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = borrow_copy(&client, &admin, &bob_copy, bob_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Copies that left the loan no longer belong to the list
    let response = client
        .post(format!("{}/catalog/bookinstances/{}/return", BASE_URL, returned_copy))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(format!("{}/catalog/bookinstances/{}/status", BASE_URL, maintenance_copy))
        .bearer_auth(&admin)
        .json(&json!({ "status": "m" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let mine = my_copy_ids(&client, &alice).await;
    assert_eq!(mine, vec![alice_copy]);
    assert!(!mine.contains(&bob_copy));
}

#[tokio::test]
#[ignore]
async fn test_status_change_cannot_lend() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let copy_id = create_available_copy(&client, &token).await;

    let response = client
        .put(format!("{}/catalog/bookinstances/{}/status", BASE_URL, copy_id))
        .bearer_auth(&token)
        .json(&json!({ "status": "o" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let copy: Value = client
        .get(format!("{}/catalog/bookinstances/{}", BASE_URL, copy_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(copy["status"], "a");
}

#[tokio::test]
#[ignore]
async fn test_maintenance_copy_cannot_be_borrowed() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (reader_id, _) = create_reader(&client, &token).await;
    let copy_id = create_copy(&client, &token, "m").await;

    let response = borrow_copy(&client, &token, &copy_id, reader_id).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_maintenance_clears_loan() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (reader_id, _) = create_reader(&client, &token).await;
    let copy_id = create_available_copy(&client, &token).await;

    let response = borrow_copy(&client, &token, &copy_id, reader_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let copy: Value = client
        .put(format!("{}/catalog/bookinstances/{}/status", BASE_URL, copy_id))
        .bearer_auth(&token)
        .json(&json!({ "status": "m" }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(copy["status"], "m");
    assert!(copy["borrower_id"].is_null());
    assert!(copy["due_back"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_genre_names_unique_exactly() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let suffix = unique_suffix();

    for name in [format!("Fantasy {}", suffix), format!("fantasy {}", suffix)] {
        let response = client
            .post(format!("{}/catalog/genres", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = client
        .post(format!("{}/catalog/genres", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": format!("Fantasy {}", suffix) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_update_author_clears_date_of_death() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let author: Value = client
        .post(format!("{}/catalog/authors", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "first_name": "Iain",
            "last_name": format!("Banks {}", unique_suffix()),
            "date_of_birth": "1954-02-16",
            "date_of_death": "2013-06-09"
        }))
        .send()
        .await
        .expect("Failed to create author")
        .json()
        .await
        .expect("Failed to parse author");

    // Absent fields are kept, null clears
    let updated: Value = client
        .put(format!("{}/catalog/authors/{}", BASE_URL, author["id"]))
        .bearer_auth(&token)
        .json(&json!({ "date_of_death": null }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(updated["date_of_birth"], "1954-02-16");
    assert!(updated["date_of_death"].is_null());
}
