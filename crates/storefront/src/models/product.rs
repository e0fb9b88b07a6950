//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use drive_core::ProductId;
use drive_core::cart::ProductSnapshot;
use drive_core::Cents;

/// Public listing fields. Stock is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price_cents: Cents,
    pub image: Option<String>,
    pub hover_image: Option<String>,
}

/// A full product row.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price_cents: Cents,
    pub image: Option<String>,
    pub hover_image: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Display fields for a cart line.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            slug: self.slug.clone(),
            name: self.name.clone(),
            price: self.price_cents,
            image: self.image.clone(),
            hover_image: self.hover_image.clone(),
        }
    }
}
