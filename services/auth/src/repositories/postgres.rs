//! PostgreSQL credential store

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use common::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};

use super::CredentialStore;
use crate::models::{NewLoginAttempt, NewUser, Role, User};

const USER_COLUMNS: &str = "id, name, username, email, password_hash, role_id, active, \
     registered_at, failed_attempts, locked_until";

/// Credential store backed by the `users`, `roles` and `login_attempts` tables
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The hash column holds the UTF-8 bytes of the textual hash; the rest of
/// the service works with their base64 form.
fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    let hash_bytes: Vec<u8> = row.try_get("password_hash")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: Base64::encode_string(&hash_bytes),
        role_id: row.try_get("role_id")?,
        active: row.try_get("active")?,
        registered_at: row.try_get("registered_at")?,
        failed_attempts: row.try_get("failed_attempts")?,
        locked_until: row.try_get("locked_until")?,
    })
}

/// Inverse of the mapping in [`user_from_row`]. Raw hash text is stored as-is.
fn hash_column_bytes(stored: &str) -> Vec<u8> {
    Base64::decode_vec(stored).unwrap_or_else(|_| stored.as_bytes().to_vec())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        debug!("Finding user by username: {}", username);

        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_login_attempt(&self, attempt: &NewLoginAttempt) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (username, ip_address, error_kind, attempted_at, user_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&attempt.username)
        .bind(attempt.ip_address.as_deref())
        .bind(attempt.kind.as_str())
        .bind(attempt.attempted_at)
        .bind(attempt.user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_login_attempts(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> DatabaseResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM login_attempts
            WHERE username = $1 AND attempted_at >= $2
            "#,
        )
        .bind(username)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn delete_login_attempts(&self, username: &str) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_login_attempts_before(&self, before: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_role_by_id(&self, id: i32) -> DatabaseResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_role_by_name(&self, name: &str) -> DatabaseResult<Option<Role>> {
        let role =
            sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(role)
    }

    async fn insert_user(&self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        let query = format!(
            r#"
            INSERT INTO users (name, username, email, password_hash, role_id, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(&new_user.name)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(hash_column_bytes(&new_user.password_hash))
            .bind(new_user.role_id)
            .bind(new_user.active)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        user_from_row(&row)
    }

    async fn health_check(&self) -> bool {
        common::database::health_check(&self.pool).await
    }
}
