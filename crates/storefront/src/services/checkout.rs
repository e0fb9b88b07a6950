//! Checkout: turn a cart (or an explicit item list) into a committed order.
//!
//! Validation happens before any database work. Pricing and the stock rule
//! live in [`drive_core::checkout::plan_order`]; this module wraps the plan in
//! one transaction that locks the product rows, writes the order, decrements
//! stock and removes the cart lines it consumed. The confirmation email is scheduled
//! only after commit.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use drive_core::checkout::{
    CustomerForm, LineRequest, PlanError, ValidationError, merge_lines, plan_order,
};
use drive_core::ProductId;

use super::cart::{CartBackend, CartError, CartStore};
use super::discount::DiscountService;
use super::notification::{Notifier, OrderConfirmation};
use crate::db::{OrderRepository, RepositoryError, carts, orders, products};
use crate::models::{CurrentUser, OrderReceipt};

/// Longest accepted idempotency key.
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// One explicitly submitted line.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Body of `POST /api/checkout`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub customer: CustomerForm,
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Errors that can occur during checkout.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The submitted form or items are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The order cannot be placed (empty cart, insufficient stock).
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The idempotency key is blank or too long.
    #[error("Invalid idempotency key")]
    IdempotencyKey,

    /// Cart store error.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    carts: &'a CartBackend,
    notifier: &'a Notifier,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, carts: &'a CartBackend, notifier: &'a Notifier) -> Self {
        Self {
            pool,
            carts,
            notifier,
        }
    }

    /// Place an order.
    ///
    /// Lines come from `request.items` when non-empty, otherwise from the
    /// cart behind `cart_token`. The order is attributed to `user`, falling
    /// back to the user the cart is linked to.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for bad customer details or items.
    /// Returns `CheckoutError::Plan` for an empty cart or insufficient stock.
    /// Returns `CheckoutError::Repository` if the transaction fails; nothing
    /// is persisted in that case.
    #[instrument(skip_all, fields(user_id = ?user.map(|u| u.id)))]
    pub async fn checkout(
        &self,
        cart_token: Option<&str>,
        user: Option<&CurrentUser>,
        request: CheckoutRequest,
    ) -> Result<OrderReceipt, CheckoutError> {
        let CheckoutRequest {
            customer,
            items,
            discount_code,
            idempotency_key,
        } = request;

        let customer = customer.validate()?;
        let idempotency_key = normalize_idempotency_key(idempotency_key)?;
        let explicit = explicit_lines(items.unwrap_or_default())?;

        if let Some(key) = idempotency_key.as_deref()
            && let Some(existing) = self.replay(key).await?
        {
            return Ok(existing);
        }

        // Explicit lines and in-memory carts are known up front. A server-side
        // cart is read under lock inside the transaction.
        let from_cart = explicit.is_empty();
        let mut lines = explicit;
        if from_cart
            && let (CartBackend::Local(store), Some(token)) = (self.carts, cart_token)
        {
            lines = store.get(token).await?.line_requests();
        }
        let session_cart = match (self.carts, cart_token) {
            (CartBackend::Session(_), Some(token)) if from_cart => Some(token),
            _ => None,
        };
        if session_cart.is_none() && lines.is_empty() {
            return Err(PlanError::EmptyCart.into());
        }

        let discount = match discount_code.as_deref() {
            Some(code) if !code.trim().is_empty() => {
                let found = DiscountService::new(self.pool).validate(code).await?;
                if found.is_none() {
                    tracing::warn!(code = %code, "Ignoring unknown or inactive discount code");
                }
                found
            }
            _ => None,
        };

        let user_id = match (user, cart_token) {
            (Some(u), _) => Some(u.id),
            (None, Some(token)) => self.carts.owner(token).await?,
            (None, None) => None,
        };

        let mut tx = self.pool.begin().await?;

        let mut consumed = None;
        if let Some(token) = session_cart
            && let Some(cart) = carts::lock_for_checkout(&mut tx, token).await?
        {
            lines = cart
                .lines
                .iter()
                .map(|l| LineRequest {
                    product_id: l.product.id,
                    quantity: l.quantity,
                })
                .collect();
            let item_ids: Vec<_> = cart.lines.iter().map(|l| l.id).collect();
            consumed = Some((cart.id, item_ids));
        }
        if lines.is_empty() {
            return Err(PlanError::EmptyCart.into());
        }

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let locked = products::lock_for_checkout(&mut tx, &ids).await?;
        let plan = plan_order(&lines, &locked, discount.as_ref())?;
        if !plan.dropped.is_empty() {
            tracing::warn!(dropped = ?plan.dropped, "Skipping products that no longer exist");
        }

        let inserted = orders::insert(
            &mut tx,
            orders::NewOrder {
                user_id,
                customer: &customer,
                plan: &plan,
                idempotency_key: idempotency_key.as_deref(),
            },
        )
        .await;
        let receipt = match inserted {
            Ok(receipt) => receipt,
            Err(RepositoryError::Conflict(_)) if idempotency_key.is_some() => {
                // A concurrent submission with the same key committed first.
                tx.rollback().await?;
                let key = idempotency_key.as_deref().unwrap_or_default();
                return self
                    .replay(key)
                    .await?
                    .ok_or(CheckoutError::IdempotencyKey);
            }
            Err(e) => return Err(e.into()),
        };

        for line in &plan.lines {
            products::decrement_stock(&mut tx, line.product_id, line.quantity).await?;
        }
        if let Some((cart_id, item_ids)) = &consumed {
            carts::remove_lines(&mut tx, *cart_id, item_ids).await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %receipt.id,
            total_cents = %receipt.total_cents,
            lines = plan.lines.len(),
            "Order placed"
        );

        if from_cart
            && let (CartBackend::Local(store), Some(token)) = (self.carts, cart_token)
        {
            store.remove_ordered(token, &lines).await;
        }

        self.notifier
            .dispatch(OrderConfirmation::new(receipt.id, customer, plan));

        Ok(receipt)
    }

    async fn replay(&self, key: &str) -> Result<Option<OrderReceipt>, CheckoutError> {
        let existing = OrderRepository::new(self.pool)
            .find_by_idempotency_key(key)
            .await?;
        if let Some(receipt) = &existing {
            tracing::info!(order_id = %receipt.id, "Replaying order for idempotency key");
        }
        Ok(existing)
    }
}

/// Validate and merge explicitly submitted lines.
fn explicit_lines(items: Vec<CheckoutItem>) -> Result<Vec<LineRequest>, ValidationError> {
    let requests = items
        .into_iter()
        .map(|i| LineRequest::new(i.product_id, i.quantity))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_lines(requests))
}

/// Trim the key; absent or blank means no key.
fn normalize_idempotency_key(key: Option<String>) -> Result<Option<String>, CheckoutError> {
    let Some(key) = key.map(|k| k.trim().to_owned()).filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(CheckoutError::IdempotencyKey);
    }
    Ok(Some(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_flattened_customer() {
        let body = serde_json::json!({
            "email": "jana@example.cz",
            "firstName": "Jana",
            "lastName": "Nováková",
            "address": "Dlouhá 12",
            "city": "Praha",
            "zipCode": "110 00",
            "paymentMethod": "bank_transfer",
            "items": [{"productId": 1, "quantity": 2}],
            "discountCode": "drive10",
            "idempotencyKey": "abc"
        });
        let req: CheckoutRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.customer.first_name.as_deref(), Some("Jana"));
        assert_eq!(req.customer.zip_code.as_deref(), Some("110 00"));
        assert_eq!(req.items.as_ref().unwrap().len(), 1);
        assert_eq!(req.discount_code.as_deref(), Some("drive10"));
        assert_eq!(req.idempotency_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_client_prices_are_ignored() {
        let body = serde_json::json!({
            "items": [{"productId": 1, "quantity": 1, "price": 1}],
        });
        let req: CheckoutRequest = serde_json::from_value(body).unwrap();
        let lines = explicit_lines(req.items.unwrap()).unwrap();
        assert_eq!(
            lines,
            vec![LineRequest {
                product_id: ProductId::new(1),
                quantity: 1
            }]
        );
    }

    #[test]
    fn test_explicit_lines_merge_duplicates() {
        let items = vec![
            CheckoutItem {
                product_id: ProductId::new(3),
                quantity: 1,
            },
            CheckoutItem {
                product_id: ProductId::new(1),
                quantity: 2,
            },
            CheckoutItem {
                product_id: ProductId::new(3),
                quantity: 4,
            },
        ];
        let lines = explicit_lines(items).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, ProductId::new(3));
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn test_explicit_lines_reject_zero_quantity() {
        let items = vec![CheckoutItem {
            product_id: ProductId::new(1),
            quantity: 0,
        }];
        assert_eq!(
            explicit_lines(items),
            Err(ValidationError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_idempotency_key_normalization() {
        assert_eq!(normalize_idempotency_key(None).unwrap(), None);
        assert_eq!(normalize_idempotency_key(Some("  ".into())).unwrap(), None);
        assert_eq!(
            normalize_idempotency_key(Some(" k1 ".into())).unwrap(),
            Some("k1".into())
        );
        assert!(matches!(
            normalize_idempotency_key(Some("x".repeat(129))),
            Err(CheckoutError::IdempotencyKey)
        ));
    }
}
