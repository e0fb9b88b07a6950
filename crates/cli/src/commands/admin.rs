//! Admin role management.
//!
//! Accounts are created through `POST /api/auth/register`; these commands
//! only flip the role of an existing account.
//!
//! # Usage
//!
//! ```bash
//! drive-cli admin grant -e admin@drive-energy.cz
//! drive-cli admin revoke -e admin@drive-energy.cz
//! ```

use drive_core::{Email, UserRole};
use drive_storefront::db::{RepositoryError, UserRepository};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with this email.
    #[error("No account registered with email: {0}")]
    UnknownUser(String),

    /// Database error.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// The role an account should end up with.
const fn target_role(admin: bool) -> UserRole {
    if admin {
        UserRole::Admin
    } else {
        UserRole::Customer
    }
}

/// Grant (`admin = true`) or revoke the admin role.
///
/// # Errors
///
/// Returns `AdminError::InvalidEmail` for a malformed address and
/// `AdminError::UnknownUser` if no account has it.
pub async fn set_admin(email: &str, admin: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let role = target_role(admin);

    let pool = super::connect().await?;

    match UserRepository::new(&pool).set_role(&parsed, role).await {
        Ok(()) => {
            tracing::info!("Set role of {} to {}", parsed, role);
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(AdminError::UnknownUser(parsed.to_string()).into()),
        Err(e) => Err(AdminError::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_role() {
        assert_eq!(target_role(true), UserRole::Admin);
        assert_eq!(target_role(false), UserRole::Customer);
    }
}
