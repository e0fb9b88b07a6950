//! Order repository.
//!
//! Inserts run on the checkout transaction's connection; reads use the pool.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use drive_core::checkout::{CustomerDetails, OrderPlan};
use drive_core::{Cents, OrderId, OrderStatus, PaymentMethod, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Order, OrderItem, OrderReceipt};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    email: String,
    phone: Option<String>,
    first_name: String,
    last_name: String,
    address: String,
    city: String,
    zip_code: String,
    payment_method: String,
    subtotal_cents: Cents,
    discount_code: Option<String>,
    discount_percent: Option<i32>,
    discount_cents: Cents,
    total_cents: Cents,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        Ok(Order {
            id: self.id,
            email: self.email,
            phone: self.phone,
            first_name: self.first_name,
            last_name: self.last_name,
            address: self.address,
            city: self.city,
            zip_code: self.zip_code,
            payment_method,
            subtotal_cents: self.subtotal_cents,
            discount_code: self.discount_code,
            discount_percent: self.discount_percent,
            discount_cents: self.discount_cents,
            total_cents: self.total_cents,
            status,
            created_at: self.created_at,
            items,
        })
    }
}

/// Order fields that do not come from the plan.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub user_id: Option<UserId>,
    pub customer: &'a CustomerDetails,
    pub plan: &'a OrderPlan,
    pub idempotency_key: Option<&'a str>,
}

/// Insert an order and its snapshot items.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the idempotency key was already used.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(
    conn: &mut PgConnection,
    order: NewOrder<'_>,
) -> Result<OrderReceipt, RepositoryError> {
    let NewOrder {
        user_id,
        customer,
        plan,
        idempotency_key,
    } = order;
    let discount = plan.discount.as_ref();

    let receipt = sqlx::query_as::<_, OrderReceipt>(
        r"
        INSERT INTO shop.orders (
            user_id, email, phone, first_name, last_name, address, city, zip_code,
            payment_method, subtotal_cents, discount_code, discount_percent,
            discount_cents, total_cents, status, idempotency_key
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING id, total_cents, discount_cents
        ",
    )
    .bind(user_id)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.address)
    .bind(&customer.city)
    .bind(&customer.zip_code)
    .bind(customer.payment_method.as_str())
    .bind(plan.subtotal)
    .bind(discount.map(|d| d.code.as_str()))
    .bind(discount.map(|d| i32::from(d.percent)))
    .bind(plan.discount_amount())
    .bind(plan.total)
    .bind(OrderStatus::Pending.as_str())
    .bind(idempotency_key)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, "order with this idempotency key"))?;

    for line in &plan.lines {
        let quantity = i32::try_from(line.quantity).map_err(|_| {
            RepositoryError::Conflict(format!("quantity too large for {}", line.product_name))
        })?;
        sqlx::query(
            r"
            INSERT INTO shop.order_items (order_id, product_id, product_name, quantity, unit_price_cents)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(receipt.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(receipt)
}

/// Repository for order reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the order placed with an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<OrderReceipt>, RepositoryError> {
        let receipt = sqlx::query_as::<_, OrderReceipt>(
            r"
            SELECT id, total_cents, discount_cents
            FROM shop.orders
            WHERE idempotency_key = $1
            ",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(receipt)
    }

    /// All orders of a user, newest first, with their items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored enum is unknown.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, email, phone, first_name, last_name, address, city, zip_code,
                   payment_method, subtotal_cents, discount_code, discount_percent,
                   discount_cents, total_cents, status, created_at
            FROM shop.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, product_name, quantity, unit_price_cents
            FROM shop.order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}
