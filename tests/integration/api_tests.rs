//! API integration tests
//!
//! Drive the full router in-process against the in-memory store seeded from
//! `data/books.json`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookshelf_server::{
    api::create_router,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    services::{catalog::CatalogService, Services},
    AppState,
};

const ADMIN_EMAIL: &str = "admin@bookshelf.test";

/// Build a router over a freshly seeded in-memory store
async fn test_app() -> Router {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;
    config.auth.admin_emails = vec![ADMIN_EMAIL.to_string()];

    let services = Services::new(Repository::in_memory(), &config);
    let entries =
        CatalogService::load_seed_file(concat!(env!("CARGO_MANIFEST_DIR"), "/data/books.json"))
            .await
            .expect("seed file");
    services.catalog.seed(entries).await.expect("seed catalog");

    create_router(AppState {
        services: Arc::new(services),
    })
}

/// Send one request and decode the JSON body (`Null` when empty)
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Register an account and log it in; returns the token and user id
async fn member(app: &Router, name: &str, email: &str) -> (String, i64) {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = body["token"].as_str().expect("token").to_string();
    let id = body["user"]["id"].as_i64().expect("user id");
    (token, id)
}

async fn book_by_title(app: &Router, encoded_title: &str) -> Value {
    let (status, body) = send(
        app,
        Method::GET,
        &format!("/api/v1/books/{}", encoded_title),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn borrow(app: &Router, token: &str, book_id: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/v1/loans",
        Some(token),
        Some(json!({ "book_id": book_id })),
    )
    .await
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = test_app().await;
    let (token, id) = member(&app, "Alice", "alice@example.org").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_i64(), Some(id));
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["role"], "member");
    assert!(body.get("password_hash").is_none());

    let (status, _) = send(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = test_app().await;
    member(&app, "Alice", "alice@example.org").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": "Alicia", "email": "ALICE@example.org", "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Registration failed. User may already exist.");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": "Bob", "email": "not-an-email", "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": "   ", "email": "blank@example.org", "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = test_app().await;
    member(&app, "Alice", "alice@example.org").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "alice@example.org", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_books_by_category() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|b| b["title"].as_str().expect("title"))
        .collect();
    let mut sorted = titles.clone();
    sorted.sort();
    assert_eq!(titles, sorted);
    assert!(titles.contains(&"Dune"));

    let (status, body) = send(&app, Method::GET, "/api/v1/books?category=Children", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().expect("array");
    assert!(!books.is_empty());
    assert!(books.iter().all(|b| b["category"] == "Children"));

    let (status, body) = send(&app, Method::GET, "/api/v1/books?category=All", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(titles.len()));

    let (status, _) = send(&app, Method::GET, "/api/v1/books?category=Poetry", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_book_by_title() {
    let app = test_app().await;

    let book = book_by_title(&app, "The%20Secret%20History").await;
    assert_eq!(book["title"], "The Secret History");
    assert_eq!(book["genres"][0], "Dark Academia");

    let (status, body) = send(&app, Method::GET, "/api/v1/books/Nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4);
}

#[tokio::test]
async fn test_add_book_requires_admin() {
    let app = test_app().await;
    let (member_token, _) = member(&app, "Alice", "alice@example.org").await;
    let (admin_token, _) = member(&app, "Libby", ADMIN_EMAIL).await;

    let new_book = json!({
        "title": "Piranesi",
        "authors": [{ "name": "Susanna Clarke" }],
        "category": "Adult",
        "genres": ["Fantasy", "Fiction"],
        "url": "https://example.org/piranesi",
        "description": "A house of endless halls.\n\nAnd a man who lives there.",
        "pages": 272,
        "copies": 4
    });

    let (status, _) = send(&app, Method::POST, "/api/v1/books", None, Some(new_book.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&member_token),
        Some(new_book.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&admin_token),
        Some(new_book.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["copies"], 4);
    assert_eq!(body["available"], 4);
    assert_eq!(body["description"].as_array().map(Vec::len), Some(2));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&admin_token),
        Some(new_book),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&admin_token),
        Some(json!({
            "title": "   ",
            "authors": [{ "name": "Nobody" }],
            "category": "Adult",
            "genres": ["Fiction"],
            "url": "https://example.org/blank",
            "description": "Text.",
            "pages": 10,
            "copies": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_loan_lifecycle() {
    let app = test_app().await;
    let (token, user_id) = member(&app, "Alice", "alice@example.org").await;
    let dune = book_by_title(&app, "Dune").await;
    let book_id = dune["id"].as_i64().expect("book id");
    let copies = dune["copies"].as_i64().expect("copies");

    // Borrow
    let (status, body) = borrow(&app, &token, book_id).await;
    assert_eq!(status, StatusCode::CREATED);
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");
    assert_eq!(body["loan"]["user_id"].as_i64(), Some(user_id));
    assert_eq!(body["loan"]["renew_count"], 0);
    assert_eq!(book_by_title(&app, "Dune").await["available"].as_i64(), Some(copies - 1));

    // Same book again while the loan is open
    let (status, body) = borrow(&app, &token, book_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 10);
    assert_eq!(book_by_title(&app, "Dune").await["available"].as_i64(), Some(copies - 1));

    let (status, body) = send(&app, Method::GET, "/api/v1/loans", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["book_title"], "Dune");
    assert_eq!(body[0]["can_renew"], true);
    assert_eq!(body[0]["is_overdue"], false);

    // Two renewals, then the limit
    let renew_uri = format!("/api/v1/loans/{}/renew", loan_id);
    for expected in 1..=2 {
        let (status, body) = send(&app, Method::POST, &renew_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loan"]["renew_count"], expected);
    }
    let (status, body) = send(&app, Method::POST, &renew_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 12);

    // Open loans cannot be deleted
    let loan_uri = format!("/api/v1/loans/{}", loan_id);
    let (status, body) = send(&app, Method::DELETE, &loan_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 15);

    // Return, once
    let return_uri = format!("/api/v1/loans/{}/return", loan_id);
    let (status, body) = send(&app, Method::POST, &return_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["loan"]["return_date"].is_string());
    assert_eq!(book_by_title(&app, "Dune").await["available"].as_i64(), Some(copies));

    let (status, body) = send(&app, Method::POST, &return_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 14);
    assert_eq!(book_by_title(&app, "Dune").await["available"].as_i64(), Some(copies));

    // Closed loans can be deleted
    let (status, body) = send(&app, Method::DELETE, &loan_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, body) = send(&app, Method::GET, "/api/v1/loans", Some(&token), None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_borrow_refused_when_no_copy_left() {
    let app = test_app().await;
    let (alice, _) = member(&app, "Alice", "alice@example.org").await;
    let (bob, _) = member(&app, "Bob", "bob@example.org").await;

    let book = book_by_title(&app, "The%20Secret%20History").await;
    assert_eq!(book["copies"], 1);
    let book_id = book["id"].as_i64().expect("book id");

    let (status, _) = borrow(&app, &alice, book_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = borrow(&app, &bob, book_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 11);

    let (status, _) = borrow(&app, &bob, 9_999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loans_are_owner_only() {
    let app = test_app().await;
    let (alice, _) = member(&app, "Alice", "alice@example.org").await;
    let (bob, _) = member(&app, "Bob", "bob@example.org").await;

    let book_id = book_by_title(&app, "Matilda").await["id"]
        .as_i64()
        .expect("book id");
    let (_, body) = borrow(&app, &alice, book_id).await;
    let loan_id = body["loan"]["id"].as_i64().expect("loan id");

    for (method, uri) in [
        (Method::POST, format!("/api/v1/loans/{}/renew", loan_id)),
        (Method::POST, format!("/api/v1/loans/{}/return", loan_id)),
        (Method::DELETE, format!("/api/v1/loans/{}", loan_id)),
    ] {
        let (status, _) = send(&app, method, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (_, body) = send(&app, Method::GET, "/api/v1/loans", Some(&bob), None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    let (status, _) = send(&app, Method::POST, "/api/v1/loans/9999/renew", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loans_require_authentication() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/v1/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/v1/loans", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/loans/{id}/renew"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());

    let description = body["paths"]["/books"]["get"]["description"]
        .as_str()
        .expect("list books description");
    assert!(description.contains("case-insensitively"));
    assert!(body["paths"]["/books"]["get"]["responses"]["400"].is_object());
}
