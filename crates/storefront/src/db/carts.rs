//! Server-side cart repository.
//!
//! A cart row is created lazily the first time a token touches the cart and
//! is never deleted, only emptied. All line operations are scoped by
//! `cart_id` so an item id from another cart is treated as absent.

use sqlx::{PgConnection, PgPool};

use drive_core::cart::{CartLine, ProductSnapshot};
use drive_core::{CartId, CartItemId, Cents, ProductId, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    product_id: ProductId,
    slug: String,
    name: String,
    price_cents: Cents,
    image: Option<String>,
    hover_image: Option<String>,
    quantity: i32,
}

impl CartLineRow {
    fn into_line(self) -> Result<CartLine, RepositoryError> {
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "cart item {} has negative quantity {}",
                self.id, self.quantity
            ))
        })?;
        Ok(CartLine {
            id: self.id,
            product: ProductSnapshot {
                id: self.product_id,
                slug: self.slug,
                name: self.name,
                price: self.price_cents,
                image: self.image,
                hover_image: self.hover_image,
            },
            quantity,
        })
    }
}

/// Repository for carts and cart items.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the cart for a token without creating one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_id(&self, token: &str) -> Result<Option<CartId>, RepositoryError> {
        let id = sqlx::query_scalar("SELECT id FROM shop.carts WHERE session_token = $1")
            .bind(token)
            .fetch_optional(self.pool)
            .await?;
        Ok(id)
    }

    /// Get the cart for a token, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, token: &str) -> Result<CartId, RepositoryError> {
        let id = sqlx::query_scalar(
            r"
            INSERT INTO shop.carts (session_token)
            VALUES ($1)
            ON CONFLICT (session_token) DO UPDATE SET updated_at = now()
            RETURNING id
            ",
        )
        .bind(token)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Lines of a cart in insertion order, joined with live product data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id, ci.product_id, p.slug, p.name, p.price_cents,
                   p.image, p.hover_image, ci.quantity
            FROM shop.cart_items ci
            JOIN shop.products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLineRow::into_line).collect()
    }

    /// Add units of a product, incrementing an existing line.
    ///
    /// The stored quantity is capped at `max_quantity`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
        max_quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity.min(max_quantity)).unwrap_or(i32::MAX);
        let max = i32::try_from(max_quantity).unwrap_or(i32::MAX);
        sqlx::query(
            r"
            INSERT INTO shop.cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = LEAST(shop.cart_items.quantity + EXCLUDED.quantity, $4)
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(max)
        .execute(self.pool)
        .await?;
        self.touch(cart_id).await
    }

    /// Set a line's quantity. Unknown or foreign item ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
        sqlx::query("UPDATE shop.cart_items SET quantity = $3 WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;
        self.touch(cart_id).await
    }

    /// Delete a line. Deleting an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM shop.cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        self.touch(cart_id).await
    }

    /// Delete every line of a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM shop.cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        self.touch(cart_id).await
    }

    /// Attribute a token's cart to a user. No-op if the token has no cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn link_user(&self, token: &str, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shop.carts
            SET user_id = $2, updated_at = now()
            WHERE session_token = $1
            ",
        )
        .bind(token)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The user a token's cart is linked to, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owner(&self, token: &str) -> Result<Option<UserId>, RepositoryError> {
        let owner: Option<Option<UserId>> =
            sqlx::query_scalar("SELECT user_id FROM shop.carts WHERE session_token = $1")
                .bind(token)
                .fetch_optional(self.pool)
                .await?;
        Ok(owner.flatten())
    }

    async fn touch(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shop.carts SET updated_at = now() WHERE id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// A cart and its lines, locked for the rest of a checkout transaction.
#[derive(Debug)]
pub struct LockedCart {
    pub id: CartId,
    pub lines: Vec<CartLine>,
}

/// Lock a token's cart row and its lines on a checkout transaction.
///
/// Holding the cart row makes a concurrent `get_or_create` (and so every
/// add) wait for the transaction to finish; holding the line rows does the
/// same for quantity updates and removals. The returned lines are therefore
/// exactly the lines the order consumes.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn lock_for_checkout(
    conn: &mut PgConnection,
    token: &str,
) -> Result<Option<LockedCart>, RepositoryError> {
    let id: Option<CartId> =
        sqlx::query_scalar("SELECT id FROM shop.carts WHERE session_token = $1 FOR UPDATE")
            .bind(token)
            .fetch_optional(&mut *conn)
            .await?;
    let Some(id) = id else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, CartLineRow>(
        r"
        SELECT ci.id, ci.product_id, p.slug, p.name, p.price_cents,
               p.image, p.hover_image, ci.quantity
        FROM shop.cart_items ci
        JOIN shop.products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.id
        FOR UPDATE OF ci
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let lines = rows
        .into_iter()
        .map(CartLineRow::into_line)
        .collect::<Result<_, _>>()?;
    Ok(Some(LockedCart { id, lines }))
}

/// Delete the given lines of a cart on an existing transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn remove_lines(
    conn: &mut PgConnection,
    cart_id: CartId,
    item_ids: &[CartItemId],
) -> Result<(), RepositoryError> {
    if item_ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM shop.cart_items WHERE cart_id = $1 AND id = ANY($2)")
        .bind(cart_id)
        .bind(item_ids)
        .execute(conn)
        .await?;
    Ok(())
}
