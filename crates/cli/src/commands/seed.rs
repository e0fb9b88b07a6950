//! Seed the catalog and discount codes from YAML.
//!
//! The bundled `seed/catalog.yaml` holds the default DRIVE Energy product
//! line and the `DRIVE10` code. Existing rows (matched by slug or code) are
//! left alone unless `--overwrite` is given.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use drive_core::Cents;
use drive_core::discount::Discount;
use drive_storefront::db::products::NewProduct;
use drive_storefront::db::{DiscountRepository, ProductRepository, RepositoryError};

/// Catalog compiled into the binary.
const BUNDLED_CATALOG: &str = include_str!("../../seed/catalog.yaml");

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub discounts: Vec<SeedDiscount>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub slug: String,
    pub name: String,
    pub price_cents: i64,
    pub image: Option<String>,
    pub hover_image: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_stock")]
    pub stock: i32,
}

const fn default_stock() -> i32 {
    100
}

/// One discount entry.
#[derive(Debug, Deserialize)]
pub struct SeedDiscount {
    pub code: String,
    pub percent: u8,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl From<SeedProduct> for NewProduct {
    fn from(p: SeedProduct) -> Self {
        Self {
            slug: p.slug,
            name: p.name,
            price_cents: Cents::new(p.price_cents),
            image: p.image,
            hover_image: p.hover_image,
            description: p.description,
            features: p.features,
            stock: p.stock,
        }
    }
}

/// Check a parsed catalog before touching the database.
///
/// Returns every problem found, empty if the catalog is usable.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = std::collections::HashSet::new();

    for p in &catalog.products {
        if p.slug.trim().is_empty() {
            errors.push(format!("product '{}' has an empty slug", p.name));
        } else if !slugs.insert(p.slug.to_lowercase()) {
            errors.push(format!("duplicate slug '{}'", p.slug));
        }
        if p.name.trim().is_empty() {
            errors.push(format!("product '{}' has an empty name", p.slug));
        }
        if p.price_cents < 0 {
            errors.push(format!("product '{}' has a negative price", p.slug));
        }
        if p.stock < 0 {
            errors.push(format!("product '{}' has negative stock", p.slug));
        }
    }

    for d in &catalog.discounts {
        if let Err(e) = Discount::new(&d.code, d.percent) {
            errors.push(format!("discount '{}': {e}", d.code));
        }
    }

    errors
}

/// Counts reported after a seed run.
#[derive(Debug, Default)]
struct SeedSummary {
    products_written: usize,
    products_skipped: usize,
    discounts_written: usize,
    discounts_skipped: usize,
}

/// Seed products and discount codes.
///
/// # Arguments
///
/// * `file_path` - Catalog YAML; the bundled catalog when `None`
/// * `overwrite` - Update existing rows instead of skipping them
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the catalog fails
/// validation, or a database operation fails.
pub async fn catalog(
    file_path: Option<&str>,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = match file_path {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                return Err(format!("File not found: {}", path.display()).into());
            }
            info!(path = %path.display(), "Loading catalog from file");
            tokio::fs::read_to_string(path).await?
        }
        None => {
            info!("Loading bundled catalog");
            BUNDLED_CATALOG.to_string()
        }
    };

    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    info!(
        products = catalog.products.len(),
        discounts = catalog.discounts.len(),
        "Parsed catalog"
    );

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let products = ProductRepository::new(&pool);
    let discounts = DiscountRepository::new(&pool);
    let mut summary = SeedSummary::default();

    for product in catalog.products {
        if !overwrite && products.get_by_slug(&product.slug).await?.is_some() {
            summary.products_skipped += 1;
            continue;
        }
        products.upsert(&NewProduct::from(product)).await?;
        summary.products_written += 1;
    }

    for entry in catalog.discounts {
        let discount = Discount::new(&entry.code, entry.percent)
            .map_err(|e| format!("discount '{}': {e}", entry.code))?;
        if overwrite {
            discounts.upsert(&discount, entry.active).await?;
            summary.discounts_written += 1;
            continue;
        }
        match discounts.create(&discount, entry.active).await {
            Ok(_) => summary.discounts_written += 1,
            Err(RepositoryError::Conflict(_)) => summary.discounts_skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Products written: {}", summary.products_written);
    info!("  Products skipped (already exist): {}", summary.products_skipped);
    info!("  Discounts written: {}", summary.discounts_written);
    info!("  Discounts skipped (already exist): {}", summary.discounts_skipped);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let catalog: CatalogFile = serde_yaml::from_str(BUNDLED_CATALOG).unwrap();
        assert_eq!(catalog.products.len(), 9);
        assert!(validate_catalog(&catalog).is_empty());

        let mango = catalog
            .products
            .iter()
            .find(|p| p.slug == "cans-mango")
            .unwrap();
        assert_eq!(mango.price_cents, 59900);
        assert_eq!(mango.features.len(), 4);

        assert_eq!(catalog.discounts.len(), 1);
        assert_eq!(catalog.discounts[0].code, "DRIVE10");
        assert_eq!(catalog.discounts[0].percent, 10);
        assert!(catalog.discounts[0].active);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let catalog: CatalogFile = serde_yaml::from_str(
            r"
products:
  - { slug: a, name: A, price_cents: -1 }
  - { slug: A, name: Again, price_cents: 100 }
discounts:
  - { code: '  ', percent: 10 }
  - { code: BIG, percent: 101 }
",
        )
        .unwrap();

        let errors = validate_catalog(&catalog);
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("negative price")));
        assert!(errors.iter().any(|e| e.contains("duplicate slug")));
    }

    #[test]
    fn test_missing_stock_defaults() {
        let catalog: CatalogFile =
            serde_yaml::from_str("products:\n  - { slug: x, name: X, price_cents: 1 }\n").unwrap();
        assert_eq!(catalog.products[0].stock, 100);
        assert!(catalog.discounts.is_empty());
    }
}
