//! Authentication error types for the bearer extractors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Why a bearer-authenticated request was rejected.
///
/// The variants are distinguished in logs; the response bodies stay generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No Authorization header, or not a Bearer credential.
    MissingToken,
    /// Signature, expiry, or token-type check failed.
    InvalidToken,
    /// Authenticated, but the role does not allow the endpoint.
    InsufficientRole,
}

/// Rejection for the bearer extractors. Missing credentials get 401,
/// invalid ones 403, matching the auth endpoints' contract.
#[derive(Debug)]
pub struct AuthError {
    pub(super) kind: AuthErrorKind,
}

impl AuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::MissingToken => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InvalidToken | AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::MissingToken => "Token required",
            AuthErrorKind::InvalidToken => "Invalid token",
            AuthErrorKind::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
