//! User management API endpoints. All of them require the admin role.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::AdminOnly;
use crate::db::{Database, Role};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::password;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_state!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}/role", put(set_role))
        .route("/{id}", delete(delete_user))
        .with_state(state)
}

/// List all users (without password hashes).
async fn list_users(
    State(state): State<UsersState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;
    Ok(Json(users))
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    role: Role,
}

#[derive(Serialize)]
struct CreateUserResponse {
    id: i64,
    username: String,
    role: Role,
}

async fn create_user(
    State(state): State<UsersState>,
    AdminOnly(admin): AdminOnly,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();

    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    if payload.password.len() < 4 {
        return Err(ApiError::bad_request(
            "Password must be at least 4 characters",
        ));
    }

    let existing = state
        .db
        .users()
        .get_by_username(username)
        .await
        .db_err("Failed to check username availability")?;

    if existing.is_some() {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let hash = password::hash_password(&payload.password)
        .map_err(|e| ApiError::db_error("Failed to hash password", e))?;

    let id = state
        .db
        .users()
        .create(username, &hash, payload.role)
        .await
        .db_err("Failed to create user")?;

    info!(
        username,
        role = payload.role.as_str(),
        created_by = %admin.username(),
        "User created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id,
            username: username.to_string(),
            role: payload.role,
        }),
    ))
}

#[derive(Deserialize)]
struct SetRoleRequest {
    role: Role,
}

/// Change a user's role.
///
/// Outstanding refresh tokens keep the role they were issued with until
/// they expire or the user logs in again.
async fn set_role(
    State(state): State<UsersState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<i64>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .db
        .users()
        .set_role(id, payload.role)
        .await
        .db_err("Failed to set role")?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    info!(
        user_id = id,
        role = payload.role.as_str(),
        changed_by = %admin.username(),
        "Role changed"
    );

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Delete a user and revoke all their refresh tokens.
async fn delete_user(
    State(state): State<UsersState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .tokens()
        .delete_all_by_user(id)
        .await
        .db_err("Failed to revoke tokens")?;

    let deleted = state
        .db
        .users()
        .delete(id)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = id, deleted_by = %admin.username(), "User deleted");

    Ok(Json(serde_json::json!({ "ok": true })))
}
