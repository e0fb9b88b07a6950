//! Discount code validation and administration.

use sqlx::PgPool;
use tracing::instrument;

use drive_core::DiscountId;
use drive_core::discount::{Discount, DiscountError};

use crate::db::{DiscountRepository, RepositoryError};
use crate::models::DiscountCode;

/// Errors from discount administration.
#[derive(Debug, thiserror::Error)]
pub enum DiscountServiceError {
    /// The code or percentage is not acceptable.
    #[error(transparent)]
    Invalid(#[from] DiscountError),

    /// A code with the same normalized value exists.
    #[error("discount code already exists")]
    Duplicate,

    /// No code with this id.
    #[error("discount code not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DiscountServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::Duplicate,
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Discount service.
pub struct DiscountService<'a> {
    discounts: DiscountRepository<'a>,
}

impl<'a> DiscountService<'a> {
    /// Create a new discount service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            discounts: DiscountRepository::new(pool),
        }
    }

    /// Look up an active code. Unknown, inactive and blank codes yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    #[instrument(skip(self))]
    pub async fn validate(&self, code: &str) -> Result<Option<Discount>, RepositoryError> {
        if code.trim().is_empty() {
            return Ok(None);
        }
        self.discounts.find_active(code).await
    }

    /// All codes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<DiscountCode>, DiscountServiceError> {
        Ok(self.discounts.list().await?)
    }

    /// Create a new code.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::Invalid` for a blank code or out-of-range percent.
    /// Returns `DiscountServiceError::Duplicate` if the code exists.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        code: &str,
        percent: i64,
        active: bool,
    ) -> Result<DiscountCode, DiscountServiceError> {
        let percent = u8::try_from(percent).map_err(|_| DiscountError::PercentOutOfRange)?;
        let discount = Discount::new(code, percent)?;
        let created = self.discounts.create(&discount, active).await?;
        tracing::info!(code = %created.code, percent = created.percent, "Discount code created");
        Ok(created)
    }

    /// Turn a code on or off.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::NotFound` if the id is unknown.
    #[instrument(skip(self))]
    pub async fn set_active(
        &self,
        id: DiscountId,
        active: bool,
    ) -> Result<DiscountCode, DiscountServiceError> {
        Ok(self.discounts.set_active(id, active).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_service_errors() {
        assert!(matches!(
            DiscountServiceError::from(RepositoryError::Conflict("x".into())),
            DiscountServiceError::Duplicate
        ));
        assert!(matches!(
            DiscountServiceError::from(RepositoryError::NotFound),
            DiscountServiceError::NotFound
        ));
        assert!(matches!(
            DiscountServiceError::from(RepositoryError::DataCorruption("x".into())),
            DiscountServiceError::Repository(_)
        ));
    }
}
