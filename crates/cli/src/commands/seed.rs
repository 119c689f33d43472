//! Catalog seeding command.
//!
//! Inserts a small demo catalog. Products are keyed by SKU, so re-running the
//! command skips anything already present.

use pomelo_core::{ProductCategory, ProductStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::CliError;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: Decimal,
    category: ProductCategory,
    stock: i32,
    sku: &'static str,
    brand: Option<&'static str>,
    featured: bool,
}

fn demo_catalog() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "Wireless Earbuds",
            description: "Compact true-wireless earbuds with 24 hour battery case.",
            price: dec!(59.99),
            category: ProductCategory::Electronics,
            stock: 120,
            sku: "POM-ELEC-0001",
            brand: Some("Auricle"),
            featured: true,
        },
        SeedProduct {
            name: "Mechanical Keyboard",
            description: "Tenkeyless board with hot-swappable switches.",
            price: dec!(89.00),
            category: ProductCategory::Electronics,
            stock: 45,
            sku: "POM-ELEC-0002",
            brand: Some("Keysmith"),
            featured: false,
        },
        SeedProduct {
            name: "Merino Wool Sweater",
            description: "Mid-weight crew neck, machine washable.",
            price: dec!(74.50),
            category: ProductCategory::Clothing,
            stock: 60,
            sku: "POM-CLTH-0001",
            brand: Some("Northloom"),
            featured: true,
        },
        SeedProduct {
            name: "Ceramic Planter Set",
            description: "Three matte planters with drainage trays.",
            price: dec!(32.00),
            category: ProductCategory::HomeAndGarden,
            stock: 80,
            sku: "POM-HOME-0001",
            brand: None,
            featured: false,
        },
        SeedProduct {
            name: "Trail Running Shoes",
            description: "Lightweight trail shoes with rock plate.",
            price: dec!(129.95),
            category: ProductCategory::Sports,
            stock: 35,
            sku: "POM-SPRT-0001",
            brand: Some("Ridgeline"),
            featured: true,
        },
        SeedProduct {
            name: "Yoga Mat",
            description: "6mm non-slip mat with carry strap.",
            price: dec!(24.99),
            category: ProductCategory::Sports,
            stock: 150,
            sku: "POM-SPRT-0002",
            brand: None,
            featured: false,
        },
        SeedProduct {
            name: "The Paper Garden",
            description: "Hardcover novel, 384 pages.",
            price: dec!(18.00),
            category: ProductCategory::Books,
            stock: 200,
            sku: "POM-BOOK-0001",
            brand: None,
            featured: false,
        },
        SeedProduct {
            name: "Wooden Block Set",
            description: "100-piece hardwood block set, ages 3 and up.",
            price: dec!(39.99),
            category: ProductCategory::Toys,
            stock: 0,
            sku: "POM-TOYS-0001",
            brand: Some("Grain & Gable"),
            featured: false,
        },
    ]
}

/// Seed the catalog with demo products.
///
/// Requires an admin account to exist (products record who created them).
pub async fn catalog() -> Result<(), CliError> {
    let pool = super::connect().await?;

    let admin_id: Option<i32> =
        sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin' ORDER BY id LIMIT 1")
            .fetch_optional(&pool)
            .await?;

    let Some(admin_id) = admin_id else {
        return Err(CliError::InvalidInput(
            "No admin account found. Run 'pomelo-cli admin create' first.".to_owned(),
        ));
    };

    let mut inserted = 0u32;
    let mut skipped = 0u32;

    for product in demo_catalog() {
        let status = ProductStatus::Active.derive(product.stock);
        let rows = sqlx::query(
            "INSERT INTO products \
                 (name, description, price, category, stock, sku, brand, featured, status, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (sku) DO NOTHING",
        )
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.category)
        .bind(product.stock)
        .bind(product.sku)
        .bind(product.brand)
        .bind(product.featured)
        .bind(status)
        .bind(admin_id)
        .execute(&pool)
        .await?
        .rows_affected();

        if rows > 0 {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    tracing::info!("Seeding complete. Inserted: {inserted}, skipped (already present): {skipped}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_skus_unique() {
        let catalog = demo_catalog();
        let mut skus: Vec<_> = catalog.iter().map(|p| p.sku).collect();
        skus.sort_unstable();
        skus.dedup();
        assert_eq!(skus.len(), catalog.len());
    }

    #[test]
    fn test_demo_catalog_prices_non_negative() {
        assert!(demo_catalog().iter().all(|p| p.price >= Decimal::ZERO));
    }
}
