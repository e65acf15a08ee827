mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use common::TestApp;

fn registration(email: &str) -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": email,
        "password": "password123",
        "password_confirmation": "password123"
    })
}

#[tokio::test]
async fn register_returns_profile_without_password() {
    let app = TestApp::new();

    let res = app.post("/api/register", None, registration("ada@example.com")).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["message"], "User registered successfully");
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["email"], "ada@example.com");
    assert_eq!(res.body["data"]["name"], "Ada Lovelace");
    assert!(res.body["data"]["id"].is_i64());
    assert!(res.body["data"].get("password").is_none());
    assert!(res.body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.post("/api/auth/register", None, registration("ada@example.com")).await;

    let res = app.post("/api/auth/register", None, registration("ADA@example.com")).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["errors"]["email"][0], "The email has already been taken.");
}

#[tokio::test]
async fn registration_validates_fields() {
    let app = TestApp::new();

    let res = app.post("/api/register", None, json!({ "email": "nope" })).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["message"], "The given data was invalid.");
    assert_eq!(res.body["success"], false);
    let errors = &res.body["errors"];
    assert!(errors["name"].is_array());
    assert!(errors["email"].is_array());
    assert!(errors["password"].is_array());

    let mut mismatched = registration("ada@example.com");
    mismatched["password_confirmation"] = json!("something-else");
    let res = app.post("/api/register", None, mismatched).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        res.body["errors"]["password"][0],
        "The password field confirmation does not match."
    );
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["body"].is_array());
}

#[tokio::test]
async fn login_issues_a_working_token() {
    let app = TestApp::new();
    app.post("/api/register", None, registration("ada@example.com")).await;

    let res = app
        .post(
            "/api/login",
            None,
            json!({ "email": "ada@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Login successful");
    assert_eq!(res.body["data"]["token_type"], "Bearer");
    assert_eq!(res.body["data"]["email"], "ada@example.com");
    let token = res.body["data"]["token"].as_str().unwrap().to_string();
    let (id, secret) = token.split_once('|').unwrap();
    assert!(id.parse::<i64>().is_ok());
    assert_eq!(secret.len(), 40);

    let res = app.get("/api/auth/user", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Process successful");
    assert_eq!(res.body["data"]["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new();
    app.post("/api/register", None, registration("ada@example.com")).await;

    for email in ["ada@example.com", "nobody@example.com"] {
        let res = app
            .post("/api/login", None, json!({ "email": email, "password": "wrong-password" }))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "The provided credentials are incorrect.");
        assert_eq!(res.body["error"], true);
        assert_eq!(res.body["success"], false);
    }
}

#[tokio::test]
async fn login_revokes_previous_tokens() {
    let app = TestApp::new();
    app.post("/api/register", None, registration("ada@example.com")).await;
    let credentials = json!({ "email": "ada@example.com", "password": "password123" });

    let first = app.post("/api/login", None, credentials.clone()).await;
    let first = first.body["data"]["token"].as_str().unwrap().to_string();
    let second = app.post("/api/login", None, credentials).await;
    let second = second.body["data"]["token"].as_str().unwrap().to_string();

    assert_eq!(app.get("/api/auth/user", Some(&first)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/auth/user", Some(&second)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new();
    let token = app.user_token("ada@example.com").await;

    let res = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Logged out successfully");

    let res = app.get("/api/auth/user", Some(&token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Please log in to access this resource");
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let app = TestApp::new();
    let token = app.user_token("ada@example.com").await;
    let (id, _) = token.split_once('|').unwrap();
    let forged = format!("{id}|{}", "a".repeat(40));

    assert_eq!(app.get("/api/auth/user", Some(&forged)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/auth/user", Some("garbage")).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_endpoint_is_json_404() {
    let app = TestApp::new();
    let res = app.get("/api/nope", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Endpoint not found");
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn health_and_metrics_are_served() {
    let app = TestApp::new();
    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/metrics", None).await;
    assert_eq!(res.status, StatusCode::OK);
}
