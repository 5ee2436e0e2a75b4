//! Refresh token revocation set.
//!
//! Only refresh tokens are stored; a token is honored on refresh only while
//! its JTI is present here. Access tokens are stateless and short-lived.
//! Removing a row revokes the token even though its signature and expiry
//! remain valid.

use sqlx::sqlite::SqlitePool;

/// A refresh token currently considered valid.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub jti: String,
    pub user_id: i64,
    pub issued_at: i64,
    pub expires_at: i64,
    pub created_at: String,
}

/// Store backing the revocation set.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token. Timestamps are Unix seconds.
    pub async fn create(
        &self,
        jti: &str,
        user_id: i64,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, issued_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(issued_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Look up a token by its JWT ID. `None` means revoked or never issued.
    pub async fn get_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<(i64, String, i64, i64, i64, String)> = sqlx::query_as(
            "SELECT id, jti, user_id, issued_at, expires_at, created_at FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, jti, user_id, issued_at, expires_at, created_at)| {
            RefreshTokenRecord {
                id,
                jti,
                user_id,
                issued_at,
                expires_at,
                created_at,
            }
        }))
    }

    /// Revoke a token by its JWT ID. Idempotent: revoking an absent token is
    /// not an error, the return value just reports whether a row was removed.
    pub async fn delete_by_jti(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all logically expired tokens.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < unixepoch('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List all unexpired refresh tokens for a user.
    pub async fn list_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<RefreshTokenRecord>, sqlx::Error> {
        let rows: Vec<(i64, String, i64, i64, i64, String)> = sqlx::query_as(
            "SELECT id, jti, user_id, issued_at, expires_at, created_at FROM refresh_tokens \
             WHERE user_id = ? AND expires_at >= unixepoch('now') ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, jti, user_id, issued_at, expires_at, created_at)| RefreshTokenRecord {
                id,
                jti,
                user_id,
                issued_at,
                expires_at,
                created_at,
            })
            .collect())
    }

    /// Delete all tokens for a user (logout everywhere).
    pub async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
