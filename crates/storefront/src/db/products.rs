//! Product catalog repository.
//!
//! Read paths serve the public API. The only writes are seeding and the
//! stock decrement performed inside the checkout transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use drive_core::checkout::ProductStock;
use drive_core::{Cents, ProductId};

use super::RepositoryError;
use crate::models::{Product, ProductSummary};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    price_cents: Cents,
    image: Option<String>,
    hover_image: Option<String>,
    description: Option<String>,
    features: Json<Vec<String>>,
    stock: i32,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            slug: r.slug,
            name: r.name,
            price_cents: r.price_cents,
            image: r.image,
            hover_image: r.hover_image,
            description: r.description,
            features: r.features.0,
            stock: r.stock,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StockRow {
    id: ProductId,
    name: String,
    price_cents: Cents,
    stock: i32,
}

/// Product fields accepted by [`ProductRepository::upsert`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    pub price_cents: Cents,
    pub image: Option<String>,
    pub hover_image: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub stock: i32,
}

const PRODUCT_COLUMNS: &str = "id, slug, name, price_cents, image, hover_image, \
                               description, features, stock, created_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List public product fields ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSummary>(
            r"
            SELECT id, slug, name, price_cents, image, hover_image
            FROM shop.products
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// Get a product by slug, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE lower(slug) = lower($1)"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// Look up by id when the identifier is purely numeric, by slug otherwise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, id_or_slug: &str) -> Result<Option<Product>, RepositoryError> {
        let trimmed = id_or_slug.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            // All-digit strings that overflow i32 cannot match any row.
            return match trimmed.parse::<ProductId>() {
                Ok(id) => self.get_by_id(id).await,
                Err(_) => Ok(None),
            };
        }
        self.get_by_slug(trimmed).await
    }

    /// Insert a product, or update the existing row with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let existing: Option<ProductId> =
            sqlx::query_scalar("SELECT id FROM shop.products WHERE lower(slug) = lower($1)")
                .bind(&product.slug)
                .fetch_optional(self.pool)
                .await?;

        let id = if let Some(id) = existing {
            sqlx::query(
                r"
                UPDATE shop.products
                SET name = $2, price_cents = $3, image = $4, hover_image = $5,
                    description = $6, features = $7, stock = $8
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(&product.name)
            .bind(product.price_cents)
            .bind(&product.image)
            .bind(&product.hover_image)
            .bind(&product.description)
            .bind(Json(&product.features))
            .bind(product.stock)
            .execute(self.pool)
            .await?;
            id
        } else {
            sqlx::query_scalar(
                r"
                INSERT INTO shop.products
                    (slug, name, price_cents, image, hover_image, description, features, stock)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                ",
            )
            .bind(&product.slug)
            .bind(&product.name)
            .bind(product.price_cents)
            .bind(&product.image)
            .bind(&product.hover_image)
            .bind(&product.description)
            .bind(Json(&product.features))
            .bind(product.stock)
            .fetch_one(self.pool)
            .await?
        };
        Ok(id)
    }
}

// =============================================================================
// Checkout (transaction-scoped)
// =============================================================================

/// Lock the given product rows for the rest of the transaction.
///
/// Rows are locked in id order so concurrent checkouts touching overlapping
/// products cannot deadlock. Ids with no row are simply absent from the map.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_checkout(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<HashMap<ProductId, ProductStock>, RepositoryError> {
    let rows = sqlx::query_as::<_, StockRow>(
        r"
        SELECT id, name, price_cents, stock
        FROM shop.products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.id,
                ProductStock {
                    id: r.id,
                    name: r.name,
                    price: r.price_cents,
                    stock: r.stock,
                },
            )
        })
        .collect())
}

/// Decrement stock for a locked product.
///
/// The `stock >= $2` guard and the table's check constraint both refuse to
/// go negative; a zero row count means the caller skipped the lock.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the row had insufficient stock.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: u32,
) -> Result<(), RepositoryError> {
    let quantity = i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity too large for product {id}")))?;
    let result = sqlx::query(
        r"
        UPDATE shop.products
        SET stock = stock - $2
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock for product {id}"
        )));
    }
    Ok(())
}
