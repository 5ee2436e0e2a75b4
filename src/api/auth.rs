//! Authentication API endpoints.
//!
//! - POST `/login` - Verify credentials, issue an access/refresh token pair
//! - POST `/refresh` - Exchange the refresh cookie for a new access token
//! - POST `/logout` - Revoke the refresh token and clear the cookie
//! - GET `/me` - Identity and role behind the presented access token

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::{
    Auth, ClientIp, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie,
};
use crate::db::{Database, Role};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

/// Minimum accepted password length; shorter secrets are a validation
/// error, not an authentication failure.
const MIN_PASSWORD_LENGTH: usize = 4;

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(AuthState);

pub fn router(state: AuthState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_login));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct PublicUser {
    username: String,
    role: Role,
}

#[derive(Serialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    user: PublicUser,
}

/// Verify credentials and issue a token pair. The refresh token goes out
/// only as an HttpOnly cookie; its JTI enters the revocation set.
///
/// Unknown usernames and wrong passwords produce the same response, and the
/// unknown-user path burns a dummy hash verification so the two are not
/// separable by timing either.
async fn login(
    State(state): State<AuthState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    let origin = ip.as_deref().unwrap_or("unknown");

    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "Password must be at least 4 characters",
        ));
    }

    let user = state
        .db
        .users()
        .get_by_username(username)
        .await
        .db_err("Failed to look up user")?;

    let user = match user {
        Some(user) => user,
        None => {
            password::dummy_verify(&payload.password);
            warn!(username, origin, "Login failed: unknown user");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if !password::verify_password(&payload.password, &user.password_hash) {
        warn!(username, origin, "Login failed: wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let access = state
        .jwt
        .generate_access_token(&user.username, user.role)
        .map_err(|e| {
            error!(error = %e, "Failed to generate access token");
            ApiError::internal("Failed to generate token")
        })?;

    let refresh = state
        .jwt
        .generate_refresh_token(&user.username, user.role)
        .map_err(|e| {
            error!(error = %e, "Failed to generate refresh token");
            ApiError::internal("Failed to generate token")
        })?;

    state
        .db
        .tokens()
        .create(
            &refresh.jti,
            user.id,
            refresh.issued_at as i64,
            refresh.expires_at as i64,
        )
        .await
        .db_err("Failed to record refresh token")?;

    info!(username, origin, role = user.role.as_str(), "Login succeeded");

    let cookie = refresh_cookie(&refresh.token, refresh.duration, state.secure_cookies);

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: access.token,
            user: PublicUser {
                username: user.username,
                role: user.role,
            },
        }),
    ))
}

#[derive(Serialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Exchange a valid, non-revoked refresh cookie for a new access token.
///
/// The new token is minted from the refresh token's own claims; the live
/// user record is deliberately not consulted, so a role change only takes
/// effect at the next login.
async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let claims = state.jwt.validate_refresh_token(token).map_err(|e| {
        warn!(error = %e, "Refresh failed: invalid token");
        ApiError::forbidden("Invalid refresh token")
    })?;

    // Valid signature is not enough: the JTI must still be in the
    // revocation set. Logout removes it, making the token
    // valid-but-rejected for the rest of its life.
    state
        .db
        .tokens()
        .get_by_jti(&claims.jti)
        .await
        .db_err("Failed to check refresh token")?
        .ok_or_else(|| {
            warn!(username = %claims.sub, jti = %claims.jti, "Refresh failed: token revoked");
            ApiError::forbidden("Refresh token not recognized")
        })?;

    let access = state
        .jwt
        .generate_access_token(&claims.sub, claims.role)
        .map_err(|e| {
            error!(error = %e, "Failed to generate access token");
            ApiError::internal("Failed to generate token")
        })?;

    Ok(Json(RefreshResponse {
        access_token: access.token,
    }))
}

/// Logout - revoke the refresh token and clear the cookie. Idempotent:
/// succeeds whether or not a (valid) cookie was presented.
async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = get_cookie(&headers, REFRESH_COOKIE_NAME) {
        if let Ok(claims) = state.jwt.validate_refresh_token(token) {
            match state.db.tokens().delete_by_jti(&claims.jti).await {
                Ok(revoked) => {
                    if revoked {
                        info!(username = %claims.sub, jti = %claims.jti, "Refresh token revoked");
                    }
                }
                Err(e) => error!(error = %e, "Failed to revoke refresh token"),
            }
        }
    }

    (
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "ok": true })),
    )
}

#[derive(Serialize)]
struct MeResponse {
    user: PublicUser,
}

/// Identity and role encoded in the presented access token.
async fn me(Auth(user): Auth) -> Json<MeResponse> {
    Json(MeResponse {
        user: PublicUser {
            username: user.claims.sub,
            role: user.claims.role,
        },
    })
}
