//! Status enums stored as text columns.
//!
//! Each enum round-trips through [`as_str`](OrderStatus::as_str) and
//! `FromStr` so repositories can keep plain `TEXT` columns with `CHECK`
//! constraints instead of Postgres enum types.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted status string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The database/API representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Order lifecycle status. Checkout only ever creates `Pending` orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Cancelled,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Shipped => "shipped",
    Cancelled => "cancelled",
});

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    BankTransfer,
    CashOnDelivery,
}

text_enum!(PaymentMethod, "payment method", {
    Card => "card",
    BankTransfer => "bank_transfer",
    CashOnDelivery => "cash_on_delivery",
});

/// Account role. `Admin` unlocks the discount management endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

text_enum!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});

impl UserRole {
    /// Whether this role may manage discount codes.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        for method in [
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
            PaymentMethod::CashOnDelivery,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_unknown_variant() {
        let err = "bitcoin".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err.kind, "payment method");
        assert_eq!(err.to_string(), "unknown payment method: bitcoin");
    }

    #[test]
    fn test_serde_matches_text() {
        let json = serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(json, "\"cash_on_delivery\"");
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }
}
