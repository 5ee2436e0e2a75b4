//! Authenticated HTTP client with transparent token refresh.
//!
//! Wraps `reqwest` with a cookie store so the HttpOnly refresh cookie
//! round-trips without ever being visible to calling code. The access token
//! lives only in memory; a relaunched process starts without one and
//! recovers through [`ApiClient::resume`].

use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use tracing::debug;

use super::session::{Session, SessionUser};
use crate::db::Role;

/// Errors surfaced by the client.
#[derive(Debug)]
pub enum ClientError {
    /// Login rejected by the server.
    InvalidCredentials,
    /// Authorization failed and could not be repaired by a refresh. The
    /// local session has been torn down; carries the original failure.
    SessionExpired(StatusCode),
    /// Non-authorization HTTP failure, passed through unmodified.
    Status(StatusCode),
    /// Network or protocol error.
    Transport(reqwest::Error),
    /// Malformed base URL or request path.
    Url(url::ParseError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidCredentials => write!(f, "Invalid credentials"),
            ClientError::SessionExpired(status) => {
                write!(f, "Session expired (original failure: {})", status)
            }
            ClientError::Status(status) => write!(f, "Request failed: HTTP {}", status),
            ClientError::Transport(e) => write!(f, "Transport error: {}", e),
            ClientError::Url(e) => write!(f, "Invalid URL: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::Url(e)
    }
}

#[derive(Deserialize)]
struct WireUser {
    username: String,
    role: Role,
}

impl From<WireUser> for SessionUser {
    fn from(user: WireUser) -> Self {
        SessionUser {
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(rename = "accessToken")]
    access_token: String,
    user: WireUser,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Deserialize)]
struct MeBody {
    user: WireUser,
}

/// HTTP client that authenticates every request and keeps the injected
/// [`Session`] in sync with what the server will actually accept.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    access_token: Mutex<Option<String>>,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        let http = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(Self {
            http,
            base,
            access_token: Mutex::new(None),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current in-memory access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.access_token.lock().unwrap().clone()
    }

    /// Drop the in-memory access token. The refresh cookie is untouched,
    /// so the next request recovers through the normal refresh path.
    pub fn clear_access_token(&self) {
        *self.access_token.lock().unwrap() = None;
    }

    /// Verify credentials, store the issued access token, and publish the
    /// identity to the session. The refresh cookie is captured by the
    /// cookie store as a side effect of the response.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, ClientError> {
        let url = self.base.join("/api/auth/login")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let body: LoginBody = response.json().await?;
        *self.access_token.lock().unwrap() = Some(body.access_token);

        let user = SessionUser::from(body.user);
        self.session.set(user.clone());
        Ok(user)
    }

    /// Restore the session at startup from the refresh cookie alone.
    /// Returns `Ok(None)` when no usable cookie is present; transport
    /// failures surface as errors.
    pub async fn resume(&self) -> Result<Option<SessionUser>, ClientError> {
        match self.refresh().await {
            Ok(()) => {}
            Err(ClientError::Status(_)) => return Ok(None),
            Err(e) => return Err(e),
        }

        let body: MeBody = self.get_json("/api/auth/me").await?;
        let user = SessionUser::from(body.user);
        self.session.set(user.clone());
        Ok(Some(user))
    }

    /// Revoke the refresh token server-side and tear down local state.
    /// Local teardown happens even if the server is unreachable.
    pub async fn logout(&self) {
        match self.base.join("/api/auth/logout") {
            Ok(url) => {
                if let Err(e) = self.http.post(url).send().await {
                    debug!(error = %e, "Logout request failed; clearing local session anyway");
                }
            }
            Err(e) => debug!(error = %e, "Logout URL invalid; clearing local session anyway"),
        }
        self.teardown();
    }

    /// Identity behind the current access token, per the server.
    pub async fn me(&self) -> Result<SessionUser, ClientError> {
        let body: MeBody = self.get_json("/api/auth/me").await?;
        Ok(SessionUser::from(body.user))
    }

    /// GET a protected resource and decode its JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(Method::GET, path, None).await?;
        Ok(response.json().await?)
    }

    /// POST to a protected resource and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        Ok(response.json().await?)
    }

    /// Send a request with the current access token attached (when held).
    ///
    /// On an authorization failure the client refreshes exactly once and
    /// retries the original request once. A failed refresh, or a second
    /// authorization failure on the retry, tears the session down and
    /// surfaces the original failure; there is never a second refresh for
    /// the same request. Non-authorization failures pass through.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ClientError> {
        let url = self.base.join(path)?;

        let response = self.send_once(method.clone(), url.clone(), body).await?;
        if !is_auth_failure(response.status()) {
            return ok_or_status(response);
        }

        let original = response.status();
        if let Err(e) = self.refresh().await {
            debug!(error = %e, "Refresh failed; tearing down session");
            self.teardown();
            return Err(ClientError::SessionExpired(original));
        }

        let retry = self.send_once(method, url, body).await?;
        if is_auth_failure(retry.status()) {
            self.teardown();
            return Err(ClientError::SessionExpired(original));
        }
        ok_or_status(retry)
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, url);
        if let Some(token) = self.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Exchange the refresh cookie for a new access token.
    async fn refresh(&self) -> Result<(), ClientError> {
        let url = self.base.join("/api/auth/refresh")?;
        let response = self.http.post(url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let body: TokenBody = response.json().await?;
        *self.access_token.lock().unwrap() = Some(body.access_token);
        Ok(())
    }

    /// Fail closed: ambiguity about session validity is resolved by
    /// forcing re-authentication.
    fn teardown(&self) {
        self.clear_access_token();
        self.session.clear();
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn ok_or_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status(response.status()))
    }
}
