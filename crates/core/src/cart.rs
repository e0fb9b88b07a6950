//! In-memory cart state.
//!
//! [`LocalCart`] owns the lines of a cart that is never persisted. UI-side
//! consumers register listeners with [`LocalCart::subscribe`] and receive the
//! fresh [`CartSnapshot`] after every mutation instead of re-reading state.

use core::fmt;

use serde::Serialize;

use crate::checkout::LineRequest;
use crate::{CartItemId, Cents, ProductId};

/// Upper bound on the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Clamp a requested line quantity.
///
/// Returns `None` for zero or negative requests (meaning "remove the line")
/// and caps everything else at [`MAX_LINE_QUANTITY`].
#[must_use]
pub fn clamp_quantity(requested: i64) -> Option<u32> {
    if requested <= 0 {
        return None;
    }
    let capped = requested.min(i64::from(MAX_LINE_QUANTITY));
    u32::try_from(capped).ok()
}

/// The product fields a cart line displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price: Cents,
    pub image: Option<String>,
    pub hover_image: Option<String>,
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Cents {
        Cents::new(
            self.product
                .price
                .as_i64()
                .saturating_mul(i64::from(self.quantity)),
        )
    }
}

/// Immutable view of a cart at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub total: Cents,
}

impl CartSnapshot {
    /// Build a snapshot, computing the total from the lines.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let total = lines.iter().map(CartLine::line_total).sum();
        Self { lines, total }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Handle returned by [`LocalCart::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&CartSnapshot) + Send + Sync>;

/// A cart held entirely in memory.
///
/// Line ids are assigned from a per-cart counter and never reused, so a
/// stale id from an earlier snapshot cannot address a newer line.
#[derive(Default)]
pub struct LocalCart {
    lines: Vec<CartLine>,
    next_line_id: i32,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for LocalCart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCart")
            .field("lines", &self.lines)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl LocalCart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lines and total.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from_lines(self.lines.clone())
    }

    /// Add units of a product.
    ///
    /// An existing line for the product is incremented; otherwise a new line
    /// is appended. The resulting quantity is capped at
    /// [`MAX_LINE_QUANTITY`]. A zero quantity leaves the cart untouched.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) -> CartSnapshot {
        if quantity == 0 {
            return self.snapshot();
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            line.quantity = line
                .quantity
                .saturating_add(quantity)
                .min(MAX_LINE_QUANTITY);
            // Refresh display fields in case the product changed.
            line.product = product;
        } else {
            self.next_line_id += 1;
            self.lines.push(CartLine {
                id: CartItemId::new(self.next_line_id),
                product,
                quantity: quantity.min(MAX_LINE_QUANTITY),
            });
        }
        self.notify()
    }

    /// Set a line's quantity; zero or less removes it. Unknown ids are ignored.
    pub fn set_quantity(&mut self, line_id: CartItemId, quantity: i64) -> CartSnapshot {
        match clamp_quantity(quantity) {
            None => self.lines.retain(|l| l.id != line_id),
            Some(q) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.id == line_id) {
                    line.quantity = q;
                }
            }
        }
        self.notify()
    }

    /// Remove a line. Removing an absent line is a no-op.
    pub fn remove(&mut self, line_id: CartItemId) -> CartSnapshot {
        self.lines.retain(|l| l.id != line_id);
        self.notify()
    }

    /// Remove every line.
    pub fn clear(&mut self) -> CartSnapshot {
        self.lines.clear();
        self.notify()
    }

    /// Take ordered units out of the cart.
    ///
    /// Each request reduces the line for its product by the ordered
    /// quantity; lines that reach zero are removed. Units added after the
    /// order was read, and lines for other products, stay in the cart.
    pub fn remove_ordered(&mut self, ordered: &[LineRequest]) -> CartSnapshot {
        for req in ordered {
            if let Some(line) = self
                .lines
                .iter_mut()
                .find(|l| l.product.id == req.product_id)
            {
                line.quantity = line.quantity.saturating_sub(req.quantity);
            }
        }
        self.lines.retain(|l| l.quantity > 0);
        self.notify()
    }

    /// Register a listener called with the new snapshot after each mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drop a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&self) -> CartSnapshot {
        let snapshot = self.snapshot();
        for (_, listener) in &self.listeners {
            listener(&snapshot);
        }
        snapshot
    }
}
