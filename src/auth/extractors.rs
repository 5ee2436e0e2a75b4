//! Axum extractors for bearer authentication.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthState;
use crate::db::Role;
use crate::jwt::AccessClaims;

/// Authenticated user information extracted from the access token.
///
/// Access tokens are stateless, so this is purely the signed claims; the
/// role here is the role at issuance time, corrected on the next refresh
/// or login.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }
}

/// Pull the bearer token out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthError>
where
    S: HasAuthState,
{
    let token = bearer_token(parts).ok_or_else(|| {
        debug!(path = %parts.uri.path(), "Request without bearer token");
        AuthError::new(AuthErrorKind::MissingToken)
    })?;

    let claims = state.jwt().validate_access_token(token).map_err(|e| {
        debug!(path = %parts.uri.path(), error = %e, "Rejected access token");
        AuthError::new(AuthErrorKind::InvalidToken)
    })?;

    Ok(AuthenticatedUser { claims })
}

/// Extractor for endpoints that require a valid access token.
/// Validation is purely cryptographic; no database lookup per request.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Auth)
    }
}

/// Extractor for endpoints restricted to administrators.
pub struct AdminOnly(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?;
        if user.role() != Role::Admin {
            debug!(
                username = %user.username(),
                role = user.role().as_str(),
                path = %parts.uri.path(),
                "Role not allowed"
            );
            return Err(AuthError::new(AuthErrorKind::InsufficientRole));
        }
        Ok(AdminOnly(user))
    }
}
