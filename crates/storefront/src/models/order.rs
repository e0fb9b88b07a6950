//! Order types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use drive_core::{Cents, OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId};

/// A committed order with its snapshot lines.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: Cents,
    pub discount_code: Option<String>,
    pub discount_percent: Option<i32>,
    pub discount_cents: Cents,
    pub total_cents: Cents,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// One line of a committed order.
///
/// Name and price are copied at commit time; `product_id` becomes `None` if
/// the product is later deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(skip)]
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: Cents,
}

/// What checkout reports back for a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderReceipt {
    pub id: OrderId,
    pub total_cents: Cents,
    pub discount_cents: Cents,
}
