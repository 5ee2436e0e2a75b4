//! Tests for the credential verification endpoint.
//!
//! Covers:
//! - Successful login: token pair, cookie attributes, role in the response
//! - Uniform failure shape for unknown users vs wrong passwords
//! - Validation errors distinct from authentication failures
//! - Refresh token registration in the revocation set
//! - Per-IP rate limiting
//! - Health probe

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{body_json, create_test_app, extract_set_cookies, login_request, refresh_cookie_value};
use tower::ServiceExt;

#[tokio::test]
async fn test_login_success_returns_token_pair() {
    let (app, _db, jwt) = create_test_app().await;

    let response = app.oneshot(login_request("admin", "1234")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = refresh_cookie_value(&response).expect("refresh cookie should be set");
    let raw_cookies = extract_set_cookies(&response);
    let refresh_header = raw_cookies
        .iter()
        .find(|c| c.starts_with("refreshToken="))
        .unwrap();
    assert!(refresh_header.contains("HttpOnly"));
    assert!(refresh_header.contains("SameSite=Lax"));
    assert!(
        !refresh_header.contains("Secure"),
        "plain-http test origin should not mark the cookie Secure"
    );

    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");

    // The returned access token and the cookie are both verifiable and
    // carry the same identity and role.
    let access_claims = jwt
        .validate_access_token(body["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(access_claims.sub, "admin");
    assert_eq!(access_claims.role, corral::db::Role::Admin);

    let refresh_claims = jwt.validate_refresh_token(&cookie).unwrap();
    assert_eq!(refresh_claims.sub, "admin");
    assert_eq!(refresh_claims.role, corral::db::Role::Admin);
}

#[tokio::test]
async fn test_login_records_refresh_token_in_revocation_set() {
    let (app, db, jwt) = create_test_app().await;

    let response = app.oneshot(login_request("empleado", "abcd")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = refresh_cookie_value(&response).unwrap();
    let claims = jwt.validate_refresh_token(&cookie).unwrap();

    let user = db
        .users()
        .get_by_username("empleado")
        .await
        .unwrap()
        .unwrap();
    let tokens = db.tokens().list_by_user(user.id).await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].jti, claims.jti);
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
    let (app, _db, _jwt) = create_test_app().await;

    let wrong_password = app
        .clone()
        .oneshot(login_request("admin", "wrong-password"))
        .await
        .unwrap();
    let unknown_user = app
        .oneshot(login_request("no-such-user", "whatever"))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let body_a = body_json(wrong_password).await;
    let body_b = body_json(unknown_user).await;
    assert_eq!(
        body_a, body_b,
        "failure responses must not reveal whether the username exists"
    );
}

#[tokio::test]
async fn test_empty_fields_are_validation_errors() {
    let (app, _db, _jwt) = create_test_app().await;

    let no_username = app
        .clone()
        .oneshot(login_request("", "1234"))
        .await
        .unwrap();
    assert_eq!(no_username.status(), StatusCode::BAD_REQUEST);

    let no_password = app.oneshot(login_request("admin", "")).await.unwrap();
    assert_eq!(no_password.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_password_is_validation_error_not_auth_failure() {
    let (app, _db, _jwt) = create_test_app().await;

    let response = app.oneshot(login_request("admin", "123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_is_rate_limited_per_ip() {
    let (app, _db, _jwt) = create_test_app().await;

    // A too-short password fails fast, but the limiter sits in front of the
    // handler and counts the attempt either way.
    let mut saw_too_many_requests = false;
    for _ in 0..30 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::from(
                serde_json::json!({ "username": "admin", "password": "x" }).to_string(),
            ))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            saw_too_many_requests = true;
            break;
        }
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert!(
        saw_too_many_requests,
        "repeated failures from one IP should hit the rate limit"
    );
}

#[tokio::test]
async fn test_rate_limit_does_not_leak_across_ips() {
    let (app, _db, _jwt) = create_test_app().await;

    // Exhaust the bucket for one IP with fast-failing attempts.
    for _ in 0..30 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.50")
            .body(Body::from(
                serde_json::json!({ "username": "admin", "password": "x" }).to_string(),
            ))
            .unwrap();
        app.clone().oneshot(request).await.unwrap();
    }

    // A different IP still gets through.
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.51")
        .body(Body::from(
            serde_json::json!({ "username": "admin", "password": "1234" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint_reports_database() {
    let (app, _db, _jwt) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}
