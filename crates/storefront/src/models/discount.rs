//! Discount code rows as the admin endpoints see them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use drive_core::DiscountId;

/// A stored discount code, active or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DiscountCode {
    pub id: DiscountId,
    pub code: String,
    pub percent: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
