//! Discount code repository.

use sqlx::PgPool;

use drive_core::DiscountId;
use drive_core::discount::{Discount, normalize_code};

use super::{RepositoryError, conflict_on_unique};
use crate::models::DiscountCode;

/// Repository for discount codes.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active code, matching case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored percent is out of range.
    pub async fn find_active(&self, code: &str) -> Result<Option<Discount>, RepositoryError> {
        let row: Option<(String, i32)> = sqlx::query_as(
            r"
            SELECT code, percent
            FROM shop.discount_codes
            WHERE upper(code) = $1 AND active
            ",
        )
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;

        row.map(|(code, percent)| {
            u8::try_from(percent)
                .ok()
                .and_then(|p| Discount::new(&code, p).ok())
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "discount {code} has invalid percent {percent}"
                    ))
                })
        })
        .transpose()
    }

    /// List every code, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DiscountCode>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountCode>(
            r"
            SELECT id, code, percent, active, created_at
            FROM shop.discount_codes
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a code from an already validated discount.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        discount: &Discount,
        active: bool,
    ) -> Result<DiscountCode, RepositoryError> {
        sqlx::query_as::<_, DiscountCode>(
            r"
            INSERT INTO shop.discount_codes (code, percent, active)
            VALUES ($1, $2, $3)
            RETURNING id, code, percent, active, created_at
            ",
        )
        .bind(discount.code())
        .bind(i32::from(discount.percent()))
        .bind(active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "discount code"))
    }

    /// Toggle a code on or off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the id is unknown.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_active(
        &self,
        id: DiscountId,
        active: bool,
    ) -> Result<DiscountCode, RepositoryError> {
        sqlx::query_as::<_, DiscountCode>(
            r"
            UPDATE shop.discount_codes
            SET active = $2
            WHERE id = $1
            RETURNING id, code, percent, active, created_at
            ",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Insert or update a code by its normalized value (used by seeding).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, discount: &Discount, active: bool) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            r"
            UPDATE shop.discount_codes
            SET percent = $2, active = $3
            WHERE upper(code) = $1
            ",
        )
        .bind(discount.code())
        .bind(i32::from(discount.percent()))
        .bind(active)
        .execute(self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            self.create(discount, active).await?;
        }
        Ok(())
    }
}
