//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, Role};
use crate::password;
use clap::Parser;
use tracing::{error, info};
use url::Url;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Corral",
    about = "Session and role authorization service for a farm-management API"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "4000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "corral.db")]
    pub database: String,

    /// Public origin this service is reachable at (https enables Secure cookies)
    #[arg(long, default_value = "http://localhost:4000")]
    pub public_origin: String,

    /// Browser origin allowed to call the API with credentials (repeatable)
    #[arg(long = "browser-origin", default_value = "http://localhost:4200")]
    pub browser_origins: Vec<String>,

    /// Path to file containing the access token secret.
    /// Prefer using the ACCESS_TOKEN_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret.
    /// Prefer using the REFRESH_TOKEN_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Create the demo accounts (admin, empleado, visitante) on startup
    #[arg(long)]
    pub seed_demo_users: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a token secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
fn load_secret(env_name: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_name) {
        // Clear the environment variable to prevent leaking.
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_name) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use the matching --*-secret-file flag",
            env_name
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_name, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both token secrets and enforce that they differ. A shared secret
/// would let a refresh token double as an access token.
pub fn load_token_secrets(
    access_secret_file: Option<&str>,
    refresh_secret_file: Option<&str>,
) -> Option<(String, String)> {
    let access = load_secret("ACCESS_TOKEN_SECRET", access_secret_file)?;
    let refresh = load_secret("REFRESH_TOKEN_SECRET", refresh_secret_file)?;

    if access == refresh {
        error!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        return None;
    }

    Some((access, refresh))
}

/// Parse and validate the public origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost") || url.host_str() == Some("127.0.0.1");

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Demo accounts carried over from the old deployment.
const DEMO_USERS: &[(&str, &str, Role)] = &[
    ("admin", "1234", Role::Admin),
    ("empleado", "abcd", Role::Employee),
    ("visitante", "0000", Role::Visitor),
];

/// Create the demo accounts, skipping any username that already exists.
pub async fn seed_demo_users(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    for (username, demo_password, role) in DEMO_USERS {
        if db.users().get_by_username(username).await?.is_some() {
            continue;
        }

        let hash = password::hash_password(demo_password)?;
        db.users().create(username, &hash, *role).await?;
        info!(username, role = role.as_str(), "Seeded demo user");
    }

    Ok(())
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_secret: String,
    refresh_secret: String,
    public_origin: Url,
    browser_origins: Vec<String>,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        public_origin,
        browser_origins,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
