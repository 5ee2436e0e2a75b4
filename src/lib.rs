pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod client;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

pub struct ServerConfig {
    /// Database connection (cloneable, uses a connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens (must differ from the access secret)
    pub refresh_secret: Vec<u8>,
    /// Public origin the service is reachable at; https implies Secure cookies
    pub public_origin: Url,
    /// Browser origins allowed to call the API with credentials
    pub browser_origins: Vec<String>,
}

impl ServerConfig {
    fn secure_cookies(&self) -> bool {
        self.public_origin.scheme() == "https"
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.access_secret, &config.refresh_secret));
    let rate_limit = Arc::new(RateLimitConfig::new());

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        config.secure_cookies(),
        rate_limit,
    );

    Router::new()
        .route("/health", get(health))
        .with_state(config.db.clone())
        .nest("/api", api_router)
        .layer(cors_layer(&config.browser_origins))
}

/// Database liveness probe for monitoring tools; deliberately unauthenticated.
async fn health(State(db): State<Database>) -> impl IntoResponse {
    let alive = sqlx::query("SELECT 1").execute(db.pool()).await.is_ok();
    let (status, state, database) = if alive {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    (
        status,
        Json(serde_json::json!({
            "status": state,
            "database": database,
        })),
    )
}

/// CORS for the browser client. The refresh cookie crosses origins, so the
/// allow-list is explicit; a wildcard cannot carry credentials.
fn cors_layer(browser_origins: &[String]) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = browser_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}

/// Run cleanup tasks and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
