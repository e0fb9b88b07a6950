//! Session-related types.

use serde::Serialize;

use drive_core::{Email, UserId, UserRole};

use super::User;

/// The authenticated user as handlers see it.
///
/// Resolved per request from the `auth_token` cookie; `GET /api/auth/me`
/// returns exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// User's role.
    pub role: UserRole,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Keys stored in the cart-session (tower-sessions) record.
pub mod keys {
    /// Opaque token identifying this browser's cart.
    pub const CART_TOKEN: &str = "cart_token";
}
