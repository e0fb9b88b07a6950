//! Checkout validation and order planning.
//!
//! Everything here is pure: the storefront locks product rows, hands their
//! current price and stock to [`plan_order`], and persists whatever plan comes
//! back. Keeping the arithmetic and the stock rule out of the transaction code
//! means they can be tested without a database.

use std::collections::HashMap;

use serde::Deserialize;

use crate::discount::{AppliedDiscount, Discount};
use crate::{Cents, Email, EmailError, PaymentMethod, ProductId, UnknownVariant};

// =============================================================================
// Customer details
// =============================================================================

/// Customer fields exactly as submitted, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub payment_method: Option<String>,
}

/// Validated contact and shipping details for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub phone: Option<String>,
    pub payment_method: PaymentMethod,
}

impl CustomerDetails {
    /// Full name as printed on the invoice.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Rejections raised before any order work starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
    #[error("Invalid payment method: {}", .0.value)]
    PaymentMethod(#[from] UnknownVariant),
    #[error("Quantity must be at least 1")]
    NonPositiveQuantity,
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

impl CustomerForm {
    /// Validate the form.
    ///
    /// Blank strings count as missing. Every missing field is reported at
    /// once. An absent payment method defaults to card.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for missing fields, an unparseable email
    /// or an unknown payment method.
    pub fn validate(self) -> Result<CustomerDetails, ValidationError> {
        let mut missing = Vec::new();
        let email = required(self.email, "email", &mut missing);
        let first_name = required(self.first_name, "firstName", &mut missing);
        let last_name = required(self.last_name, "lastName", &mut missing);
        let address = required(self.address, "address", &mut missing);
        let city = required(self.city, "city", &mut missing);
        let zip_code = required(self.zip_code, "zipCode", &mut missing);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let payment_method = match self.payment_method.as_deref().map(str::trim) {
            None | Some("") => PaymentMethod::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(CustomerDetails {
            email: Email::parse(&email)?,
            first_name,
            last_name,
            address,
            city,
            zip_code,
            phone: self
                .phone
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
            payment_method,
        })
    }
}

// =============================================================================
// Line requests
// =============================================================================

/// A requested (product, quantity) pair. Prices are never taken from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    /// Build a request from untrusted input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveQuantity`] for quantities below 1.
    pub fn new(product_id: ProductId, quantity: i64) -> Result<Self, ValidationError> {
        if quantity < 1 {
            return Err(ValidationError::NonPositiveQuantity);
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| ValidationError::NonPositiveQuantity)?;
        Ok(Self {
            product_id,
            quantity,
        })
    }
}

/// Merge requests for the same product, keeping first-seen order.
#[must_use]
pub fn merge_lines(requests: impl IntoIterator<Item = LineRequest>) -> Vec<LineRequest> {
    let mut merged: Vec<LineRequest> = Vec::new();
    for req in requests {
        if let Some(existing) = merged.iter_mut().find(|m| m.product_id == req.product_id) {
            existing.quantity = existing.quantity.saturating_add(req.quantity);
        } else {
            merged.push(req);
        }
    }
    merged
}

// =============================================================================
// Planning
// =============================================================================

/// Authoritative product state read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStock {
    pub id: ProductId,
    pub name: String,
    pub price: Cents,
    pub stock: i32,
}

/// One line of a planned order, with snapshot name and price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Cents,
    pub quantity: u32,
    pub line_total: Cents,
}

/// Everything needed to persist an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    /// Requested products that no longer exist.
    pub dropped: Vec<ProductId>,
    pub subtotal: Cents,
    pub discount: Option<AppliedDiscount>,
    pub total: Cents,
}

impl OrderPlan {
    /// Amount taken off by the discount, zero without one.
    #[must_use]
    pub fn discount_amount(&self) -> Cents {
        self.discount.as_ref().map_or(Cents::ZERO, |d| d.amount)
    }
}

/// Reasons an order cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Not enough stock for {product}. Available: {available}")]
    InsufficientStock { product: String, available: i32 },
    #[error("Order total is too large")]
    Overflow,
}

/// Plan an order from requested lines and locked product rows.
///
/// Lines whose product is missing from `products` are dropped and reported
/// in [`OrderPlan::dropped`]. If any remaining line asks for more than the
/// available stock the whole plan is rejected. A plan with no lines left is
/// rejected as an empty cart.
///
/// # Errors
///
/// Returns [`PlanError`] as described above, or `Overflow` if the subtotal
/// does not fit in an `i64`.
pub fn plan_order(
    requests: &[LineRequest],
    products: &HashMap<ProductId, ProductStock>,
    discount: Option<&Discount>,
) -> Result<OrderPlan, PlanError> {
    let mut lines = Vec::with_capacity(requests.len());
    let mut dropped = Vec::new();
    let mut subtotal = Cents::ZERO;

    for req in requests {
        let Some(product) = products.get(&req.product_id) else {
            dropped.push(req.product_id);
            continue;
        };
        if i64::from(product.stock) < i64::from(req.quantity) {
            return Err(PlanError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock.max(0),
            });
        }
        let line_total = product
            .price
            .checked_times(req.quantity)
            .ok_or(PlanError::Overflow)?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or(PlanError::Overflow)?;
        lines.push(PlannedLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: req.quantity,
            line_total,
        });
    }

    if lines.is_empty() {
        return Err(PlanError::EmptyCart);
    }

    let discount = discount.map(|d| d.apply(subtotal));
    let total = discount.as_ref().map_or(subtotal, |d| d.total);

    Ok(OrderPlan {
        lines,
        dropped,
        subtotal,
        discount,
        total,
    })
}
