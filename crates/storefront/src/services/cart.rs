//! Cart stores.
//!
//! [`CartStore`] is the one interface the cart API and checkout talk to.
//! Two implementations exist and one is picked at startup from
//! `STOREFRONT_CART_MODE`:
//!
//! - [`SessionCartStore`] persists lines in Postgres, keyed by the cart token
//!   held in the cart-session cookie.
//! - [`LocalCartStore`] keeps a [`LocalCart`] per token in process memory.
//!
//! Every mutation returns the freshly recomputed [`CartView`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::instrument;

use drive_core::cart::{
    CartLine, CartSnapshot, LocalCart, MAX_LINE_QUANTITY, ProductSnapshot, clamp_quantity,
};
use drive_core::checkout::LineRequest;
use drive_core::{CartId, CartItemId, Cents, ProductId, UserId};

use crate::config::CartMode;
use crate::db::{CartRepository, RepositoryError};

/// Idle lifetime of an in-memory cart, matching the cart cookie.
const LOCAL_CART_IDLE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Upper bound on in-memory carts held at once.
const LOCAL_CART_CAPACITY: u64 = 10_000;

/// Errors raised by cart stores.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Views
// =============================================================================

/// One line as returned by `/api/cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub price_cents: Cents,
    pub image: Option<String>,
    pub hover_image: Option<String>,
    pub quantity: u32,
}

impl From<CartLine> for CartItemView {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product.id,
            slug: line.product.slug,
            name: line.product.name,
            price_cents: line.product.price,
            image: line.product.image,
            hover_image: line.product.hover_image,
            quantity: line.quantity,
        }
    }
}

/// The authoritative cart payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Database cart id; `None` for in-memory carts and carts not yet created.
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItemView>,
    pub total_cents: Cents,
}

impl CartView {
    fn from_snapshot(cart_id: Option<CartId>, snapshot: CartSnapshot) -> Self {
        Self {
            cart_id,
            items: snapshot.lines.into_iter().map(CartItemView::from).collect(),
            total_cents: snapshot.total,
        }
    }

    /// Lines as checkout requests. Prices are intentionally dropped.
    #[must_use]
    pub fn line_requests(&self) -> Vec<LineRequest> {
        self.items
            .iter()
            .map(|i| LineRequest {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Store interface
// =============================================================================

/// Operations every cart store supports, keyed by the cart token.
pub trait CartStore: Send + Sync {
    /// Current cart. A token with no cart yields an empty view.
    fn get(&self, token: &str) -> impl Future<Output = Result<CartView, CartError>> + Send;

    /// Add units of a product, merging with an existing line and capping at 99.
    fn add_item(
        &self,
        token: &str,
        product: ProductSnapshot,
        quantity: u32,
    ) -> impl Future<Output = Result<CartView, CartError>> + Send;

    /// Set a line's quantity; zero or less removes the line.
    fn set_quantity(
        &self,
        token: &str,
        item_id: CartItemId,
        quantity: i64,
    ) -> impl Future<Output = Result<CartView, CartError>> + Send;

    /// Remove a line. Absent lines are ignored.
    fn remove_item(
        &self,
        token: &str,
        item_id: CartItemId,
    ) -> impl Future<Output = Result<CartView, CartError>> + Send;

    /// Remove every line.
    fn clear(&self, token: &str) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Attribute the cart to a user.
    fn link_user(
        &self,
        token: &str,
        user_id: UserId,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// The user the cart is attributed to.
    fn owner(&self, token: &str) -> impl Future<Output = Result<Option<UserId>, CartError>> + Send;
}

// =============================================================================
// Session (Postgres) store
// =============================================================================

/// Cart store persisted in `shop.carts` / `shop.cart_items`.
#[derive(Clone)]
pub struct SessionCartStore {
    pool: PgPool,
}

impl SessionCartStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> CartRepository<'_> {
        CartRepository::new(&self.pool)
    }

    async fn view(&self, cart_id: CartId) -> Result<CartView, CartError> {
        let lines = self.repo().lines(cart_id).await?;
        Ok(CartView::from_snapshot(
            Some(cart_id),
            CartSnapshot::from_lines(lines),
        ))
    }
}

impl CartStore for SessionCartStore {
    async fn get(&self, token: &str) -> Result<CartView, CartError> {
        match self.repo().find_id(token).await? {
            Some(cart_id) => self.view(cart_id).await,
            None => Ok(CartView::default()),
        }
    }

    #[instrument(skip(self, token, product), fields(product_id = %product.id))]
    async fn add_item(
        &self,
        token: &str,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        let cart_id = self.repo().get_or_create(token).await?;
        self.repo()
            .add_item(cart_id, product.id, quantity, MAX_LINE_QUANTITY)
            .await?;
        self.view(cart_id).await
    }

    #[instrument(skip(self, token), fields(item_id = %item_id))]
    async fn set_quantity(
        &self,
        token: &str,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        let Some(cart_id) = self.repo().find_id(token).await? else {
            return Ok(CartView::default());
        };
        match clamp_quantity(quantity) {
            Some(q) => self.repo().set_quantity(cart_id, item_id, q).await?,
            None => self.repo().remove_item(cart_id, item_id).await?,
        }
        self.view(cart_id).await
    }

    #[instrument(skip(self, token), fields(item_id = %item_id))]
    async fn remove_item(&self, token: &str, item_id: CartItemId) -> Result<CartView, CartError> {
        let Some(cart_id) = self.repo().find_id(token).await? else {
            return Ok(CartView::default());
        };
        self.repo().remove_item(cart_id, item_id).await?;
        self.view(cart_id).await
    }

    async fn clear(&self, token: &str) -> Result<(), CartError> {
        if let Some(cart_id) = self.repo().find_id(token).await? {
            self.repo().clear(cart_id).await?;
        }
        Ok(())
    }

    async fn link_user(&self, token: &str, user_id: UserId) -> Result<(), CartError> {
        self.repo().link_user(token, user_id).await?;
        Ok(())
    }

    async fn owner(&self, token: &str) -> Result<Option<UserId>, CartError> {
        Ok(self.repo().owner(token).await?)
    }
}

// =============================================================================
// Local (in-memory) store
// =============================================================================

#[derive(Debug, Default)]
struct LocalEntry {
    cart: LocalCart,
    owner: Option<UserId>,
}

/// Cart store that never touches the database.
///
/// Each token maps to its own [`LocalCart`] behind a `tokio` mutex; entries
/// idle for 30 days are evicted.
#[derive(Clone)]
pub struct LocalCartStore {
    carts: Cache<String, Arc<Mutex<LocalEntry>>>,
}

impl Default for LocalCartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let carts = Cache::builder()
            .max_capacity(LOCAL_CART_CAPACITY)
            .time_to_idle(LOCAL_CART_IDLE)
            .build();
        Self { carts }
    }

    async fn entry(&self, token: &str) -> Arc<Mutex<LocalEntry>> {
        self.carts
            .get_with(token.to_owned(), async { Arc::new(Mutex::new(LocalEntry::default())) })
            .await
    }

    async fn existing(&self, token: &str) -> Option<Arc<Mutex<LocalEntry>>> {
        self.carts.get(token).await
    }

    /// Take the units of a committed order out of a token's cart, leaving
    /// anything added since the order was read.
    pub async fn remove_ordered(&self, token: &str, ordered: &[LineRequest]) -> CartView {
        let Some(entry) = self.existing(token).await else {
            return CartView::default();
        };
        let snapshot = entry.lock().await.cart.remove_ordered(ordered);
        CartView::from_snapshot(None, snapshot)
    }
}

impl CartStore for LocalCartStore {
    async fn get(&self, token: &str) -> Result<CartView, CartError> {
        let Some(entry) = self.existing(token).await else {
            return Ok(CartView::default());
        };
        let snapshot = entry.lock().await.cart.snapshot();
        Ok(CartView::from_snapshot(None, snapshot))
    }

    async fn add_item(
        &self,
        token: &str,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        let entry = self.entry(token).await;
        let snapshot = entry.lock().await.cart.add(product, quantity);
        Ok(CartView::from_snapshot(None, snapshot))
    }

    async fn set_quantity(
        &self,
        token: &str,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        let Some(entry) = self.existing(token).await else {
            return Ok(CartView::default());
        };
        let snapshot = entry.lock().await.cart.set_quantity(item_id, quantity);
        Ok(CartView::from_snapshot(None, snapshot))
    }

    async fn remove_item(&self, token: &str, item_id: CartItemId) -> Result<CartView, CartError> {
        let Some(entry) = self.existing(token).await else {
            return Ok(CartView::default());
        };
        let snapshot = entry.lock().await.cart.remove(item_id);
        Ok(CartView::from_snapshot(None, snapshot))
    }

    async fn clear(&self, token: &str) -> Result<(), CartError> {
        if let Some(entry) = self.existing(token).await {
            entry.lock().await.cart.clear();
        }
        Ok(())
    }

    async fn link_user(&self, token: &str, user_id: UserId) -> Result<(), CartError> {
        if let Some(entry) = self.existing(token).await {
            entry.lock().await.owner = Some(user_id);
        }
        Ok(())
    }

    async fn owner(&self, token: &str) -> Result<Option<UserId>, CartError> {
        match self.existing(token).await {
            Some(entry) => Ok(entry.lock().await.owner),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Startup selection
// =============================================================================

/// The cart store chosen at startup.
#[derive(Clone)]
pub enum CartBackend {
    Session(SessionCartStore),
    Local(LocalCartStore),
}

impl CartBackend {
    /// Build the store for a configured mode.
    #[must_use]
    pub fn for_mode(mode: CartMode, pool: &PgPool) -> Self {
        match mode {
            CartMode::Session => Self::Session(SessionCartStore::new(pool.clone())),
            CartMode::Local => Self::Local(LocalCartStore::new()),
        }
    }

    /// The configured mode.
    #[must_use]
    pub const fn mode(&self) -> CartMode {
        match self {
            Self::Session(_) => CartMode::Session,
            Self::Local(_) => CartMode::Local,
        }
    }
}

impl CartStore for CartBackend {
    async fn get(&self, token: &str) -> Result<CartView, CartError> {
        match self {
            Self::Session(s) => s.get(token).await,
            Self::Local(s) => s.get(token).await,
        }
    }

    async fn add_item(
        &self,
        token: &str,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        match self {
            Self::Session(s) => s.add_item(token, product, quantity).await,
            Self::Local(s) => s.add_item(token, product, quantity).await,
        }
    }

    async fn set_quantity(
        &self,
        token: &str,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        match self {
            Self::Session(s) => s.set_quantity(token, item_id, quantity).await,
            Self::Local(s) => s.set_quantity(token, item_id, quantity).await,
        }
    }

    async fn remove_item(&self, token: &str, item_id: CartItemId) -> Result<CartView, CartError> {
        match self {
            Self::Session(s) => s.remove_item(token, item_id).await,
            Self::Local(s) => s.remove_item(token, item_id).await,
        }
    }

    async fn clear(&self, token: &str) -> Result<(), CartError> {
        match self {
            Self::Session(s) => s.clear(token).await,
            Self::Local(s) => s.clear(token).await,
        }
    }

    async fn link_user(&self, token: &str, user_id: UserId) -> Result<(), CartError> {
        match self {
            Self::Session(s) => s.link_user(token, user_id).await,
            Self::Local(s) => s.link_user(token, user_id).await,
        }
    }

    async fn owner(&self, token: &str) -> Result<Option<UserId>, CartError> {
        match self {
            Self::Session(s) => s.owner(token).await,
            Self::Local(s) => s.owner(token).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            slug: format!("p-{id}"),
            name: format!("P{id}"),
            price: Cents::new(price),
            image: Some("/assets/img/products/test.png".to_string()),
            hover_image: None,
        }
    }

    #[tokio::test]
    async fn test_local_store_merges_and_totals() {
        let store = LocalCartStore::new();
        store.add_item("t1", product(1, 100), 2).await.unwrap();
        let view = store.add_item("t1", product(1, 100), 1).await.unwrap();

        assert_eq!(view.cart_id, None);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.total_cents, Cents::new(300));
    }

    #[tokio::test]
    async fn test_local_store_isolates_tokens() {
        let store = LocalCartStore::new();
        store.add_item("a", product(1, 100), 1).await.unwrap();
        assert!(store.get("b").await.unwrap().is_empty());
        assert_eq!(store.get("a").await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_local_store_set_quantity_and_remove() {
        let store = LocalCartStore::new();
        store.add_item("t", product(1, 100), 1).await.unwrap();
        let view = store.add_item("t", product(2, 250), 1).await.unwrap();
        let first = view.items[0].id;
        let second = view.items[1].id;

        let view = store.set_quantity("t", first, 500).await.unwrap();
        assert_eq!(view.items[0].quantity, 99);

        let view = store.set_quantity("t", first, 0).await.unwrap();
        assert_eq!(view.items.len(), 1);

        let before = store.remove_item("t", CartItemId::new(42)).await.unwrap();
        assert_eq!(before.items.len(), 1);

        let view = store.remove_item("t", second).await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_local_store_unknown_token_is_empty() {
        let store = LocalCartStore::new();
        let view = store.set_quantity("ghost", CartItemId::new(1), 3).await.unwrap();
        assert_eq!(view, CartView::default());
        store.clear("ghost").await.unwrap();
        assert_eq!(store.owner("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_store_link_and_clear() {
        let store = CartBackend::Local(LocalCartStore::new());
        store.add_item("t", product(1, 100), 1).await.unwrap();
        store.link_user("t", UserId::new(7)).await.unwrap();
        assert_eq!(store.owner("t").await.unwrap(), Some(UserId::new(7)));

        store.clear("t").await.unwrap();
        assert!(store.get("t").await.unwrap().is_empty());
        assert_eq!(store.mode(), CartMode::Local);
    }

    #[tokio::test]
    async fn test_local_store_remove_ordered_keeps_new_lines() {
        let store = LocalCartStore::new();
        let view = store.add_item("t", product(1, 100), 2).await.unwrap();
        let ordered = view.line_requests();

        store.add_item("t", product(2, 250), 1).await.unwrap();

        let view = store.remove_ordered("t", &ordered).await;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, ProductId::new(2));
        assert_eq!(store.remove_ordered("ghost", &ordered).await, CartView::default());
    }

    #[test]
    fn test_line_requests_drop_prices() {
        let view = CartView::from_snapshot(
            None,
            CartSnapshot::from_lines(vec![CartLine {
                id: CartItemId::new(1),
                product: product(3, 999),
                quantity: 2,
            }]),
        );
        assert_eq!(
            view.line_requests(),
            vec![LineRequest {
                product_id: ProductId::new(3),
                quantity: 2
            }]
        );
    }
}
