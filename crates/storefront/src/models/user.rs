//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use drive_core::{Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Lower-cased email address.
    pub email: Email,
    /// Customer or admin.
    pub role: UserRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
