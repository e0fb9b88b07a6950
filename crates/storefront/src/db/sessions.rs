//! Bearer-token session repository.
//!
//! Expired rows are never purged here; every lookup filters on `expires_at`
//! so an expired token behaves exactly like an unknown one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use drive_core::UserId;

use super::RepositoryError;
use super::users::UserRow;
use crate::models::User;

/// Repository for login sessions.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new session token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.sessions (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Resolve an unexpired token to its user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT u.id, u.email, u.role, u.created_at
            FROM shop.sessions s
            JOIN shop.users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > now()
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Delete a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, token: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM shop.sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
