//! Tests for the admin user-management endpoints and role enforcement.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{body_json, create_test_app, login, login_request};
use corral::db::Role;
use corral::jwt::JwtConfig;
use tower::ServiceExt;

fn bearer(jwt: &JwtConfig, username: &str, role: Role) -> String {
    let token = jwt.generate_access_token(username, role).unwrap().token;
    format!("Bearer {}", token)
}

fn json_request(method: &str, uri: &str, auth: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", auth)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_admin_can_list_users_without_hashes() {
    let (app, _db, jwt) = create_test_app().await;
    let auth = bearer(&jwt, "admin", Role::Admin);

    let response = app
        .oneshot(empty_request("GET", "/api/users", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let users = body.as_array().expect("listing should be an array");
    assert_eq!(users.len(), 3);

    for user in users {
        assert!(user.get("password_hash").is_none());
        assert!(user.get("password").is_none());
    }
}

#[tokio::test]
async fn test_non_admin_roles_are_forbidden() {
    let (app, _db, jwt) = create_test_app().await;

    for role in [Role::Employee, Role::Visitor] {
        let auth = bearer(&jwt, "someone", role);
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/users", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_unauthenticated_user_management_is_unauthorized() {
    let (app, _db, _jwt) = create_test_app().await;

    let response = app
        .oneshot(empty_request("GET", "/api/users", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_creates_user_who_can_then_login() {
    let (app, _db, jwt) = create_test_app().await;
    let auth = bearer(&jwt, "admin", Role::Admin);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users",
            &auth,
            serde_json::json!({ "username": "maria", "password": "s3cret", "role": "employee" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["username"], "maria");
    assert_eq!(body["role"], "employee");

    let response = app.oneshot(login_request("maria", "s3cret")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "employee");
}

#[tokio::test]
async fn test_create_user_validation() {
    let (app, _db, jwt) = create_test_app().await;
    let auth = bearer(&jwt, "admin", Role::Admin);

    let cases = [
        serde_json::json!({ "username": "", "password": "s3cret", "role": "visitor" }),
        serde_json::json!({ "username": "has spaces", "password": "s3cret", "role": "visitor" }),
        serde_json::json!({ "username": "ok_name", "password": "abc", "role": "visitor" }),
    ];

    for body in cases {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/users", &auth, body.clone()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected validation failure for {}",
            body
        );
    }

    // Duplicate of a seeded username.
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/users",
            &auth,
            serde_json::json!({ "username": "admin", "password": "s3cret", "role": "visitor" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_can_change_roles() {
    let (app, db, jwt) = create_test_app().await;
    let auth = bearer(&jwt, "admin", Role::Admin);

    let user = db
        .users()
        .get_by_username("visitante")
        .await
        .unwrap()
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/users/{}/role", user.id),
            &auth,
            serde_json::json!({ "role": "employee" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = db.users().get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Employee);

    // Unknown user id is a 404.
    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/users/99999/role",
            &auth,
            serde_json::json!({ "role": "employee" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_user_revokes_their_refresh_tokens() {
    let (app, db, jwt) = create_test_app().await;
    let auth = bearer(&jwt, "admin", Role::Admin);

    // Give empleado a live session first.
    let (_access, refresh) = login(&app, "empleado", "abcd").await;
    let user = db
        .users()
        .get_by_username("empleado")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(db.tokens().list_by_user(user.id).await.unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/users/{}", user.id),
            Some(&auth),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(db.users().get_by_id(user.id).await.unwrap().is_none());
    assert_eq!(db.tokens().list_by_user(user.id).await.unwrap().len(), 0);

    // The orphaned refresh token can no longer refresh.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header("cookie", format!("refreshToken={}", refresh))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
