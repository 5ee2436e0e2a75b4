//! Shared helpers for the integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use corral::{ServerConfig, cli::seed_demo_users, create_app, db::Database, jwt::JwtConfig};
use tower::ServiceExt;
use url::Url;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

/// Build a ServerConfig wired to the given database with the test secrets.
pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        public_origin: Url::parse("http://localhost").expect("Invalid URL"),
        browser_origins: vec!["http://localhost:4200".to_string()],
    }
}

/// Create a test app with the demo users seeded.
/// Returns (app, db, jwt_config).
pub async fn create_test_app() -> (axum::Router, Database, JwtConfig) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    seed_demo_users(&db).await.expect("Failed to seed demo users");

    let jwt = JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET);
    let config = test_config(db.clone());
    (create_app(&config), db, jwt)
}

/// Build a login request with a JSON credential body.
pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

/// Decode a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract all Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Pull the refresh token value out of a Set-Cookie header, ignoring
/// cookie-clearing headers.
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    extract_set_cookies(response)
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .find_map(|c| {
            let rest = c.strip_prefix("refreshToken=")?;
            Some(rest.split(';').next()?.trim().to_string())
        })
}

/// Check if a Set-Cookie list clears the named cookie (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Log in through the API; panics unless the login succeeds.
/// Returns (access_token, refresh_token).
pub async fn login(app: &axum::Router, username: &str, password: &str) -> (String, String) {
    let response = app
        .clone()
        .oneshot(login_request(username, password))
        .await
        .unwrap();

    assert_eq!(
        response.status(),
        axum::http::StatusCode::OK,
        "login as {} should succeed",
        username
    );

    let refresh = refresh_cookie_value(&response).expect("login should set the refresh cookie");
    let body = body_json(response).await;
    let access = body["accessToken"]
        .as_str()
        .expect("login should return an access token")
        .to_string();

    (access, refresh)
}
