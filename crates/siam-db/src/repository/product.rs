//! # Product Repository
//!
//! Database operations for the cached product catalog.
//!
//! ## Key Operations
//! - Point lookup by code
//! - Ordered listings (all, by category)
//! - Substring search over name and code
//! - Upsert with `extra_fields` folded into a JSON column
//! - Targeted quantity updates
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Product Search Works                             │
//! │                                                                         │
//! │  User types: "toner"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pattern: %toner%  (%, _ and \ in the term are escaped)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\'              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  7591002200046 | Toner HP 12A   ← MATCH (name)                         │
//! │  7591002200053 | TONER HP 85A   ← MATCH (LIKE ignores ASCII case)      │
//! │  7591002200060 | Paper A4       ✗                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use siam_core::{ExtraFields, Product};

/// Builds a SELECT over every product column followed by `$tail`.
macro_rules! select_products {
    ($tail:literal) => {
        concat!(
            "SELECT code, name, category, quantity, unit, location, unit_price, ",
            "image_url, last_sync_timestamp, extra_fields_json FROM products ",
            $tail
        )
    };
}

/// Raw row as stored in SQLite.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    code: String,
    name: String,
    category: String,
    quantity: i64,
    unit: String,
    location: String,
    unit_price: Option<f64>,
    image_url: Option<String>,
    last_sync_timestamp: Option<DateTime<Utc>>,
    extra_fields_json: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let extra_fields = match row.extra_fields_json.as_deref() {
            None | Some("") => ExtraFields::new(),
            Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
                warn!(code = %row.code, error = %e, "Discarding unreadable extra fields");
                ExtraFields::new()
            }),
        };

        Product {
            code: row.code,
            name: row.name,
            category: row.category,
            quantity: row.quantity,
            unit: row.unit,
            location: row.location,
            unit_price: row.unit_price,
            image_url: row.image_url,
            last_sync_timestamp: row.last_sync_timestamp,
            extra_fields,
        }
    }
}

/// Escapes LIKE wildcards and wraps the term for substring matching.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("toner").await?;
/// let toner = repo.get_by_code("7591002200046").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its code.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not cached
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as::<_, ProductRow>(select_products!("WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Lists every cached product ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> =
            sqlx::query_as::<_, ProductRow>(select_products!("ORDER BY name COLLATE NOCASE, code"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Lists the products of one category ordered by name.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as::<_, ProductRow>(select_products!(
            "WHERE category = ?1 ORDER BY name COLLATE NOCASE, code"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Searches name and code by substring.
    ///
    /// SQLite's LIKE is case-insensitive for ASCII letters only, so "toner"
    /// finds "TONER" but "é" does not find "É". An empty term lists
    /// everything.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Product>> {
        let term = term.trim();

        debug!(term = %term, "Searching products");

        if term.is_empty() {
            return self.list_all().await;
        }

        let rows: Vec<ProductRow> = sqlx::query_as::<_, ProductRow>(select_products!(
            r"WHERE name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\' ORDER BY name COLLATE NOCASE, code"
        ))
        .bind(like_pattern(term))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Search returned products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts or replaces a product keyed by code.
    ///
    /// `last_sync_timestamp` is set to now; the stored copy is returned.
    pub async fn upsert(&self, product: &Product) -> DbResult<Product> {
        let now = Utc::now();
        let extra_json = if product.extra_fields.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&product.extra_fields)?)
        };

        debug!(code = %product.code, quantity = product.quantity, "Upserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                code, name, category, quantity, unit, location,
                unit_price, image_url, last_sync_timestamp, extra_fields_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                quantity = excluded.quantity,
                unit = excluded.unit,
                location = excluded.location,
                unit_price = excluded.unit_price,
                image_url = excluded.image_url,
                last_sync_timestamp = excluded.last_sync_timestamp,
                extra_fields_json = excluded.extra_fields_json
            "#,
        )
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.quantity)
        .bind(&product.unit)
        .bind(&product.location)
        .bind(product.unit_price)
        .bind(&product.image_url)
        .bind(now)
        .bind(extra_json)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            last_sync_timestamp: Some(now),
            ..product.clone()
        })
    }

    /// Updates only the quantity (and timestamp) of a product.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no product has this code
    /// * `DbError::ConstraintViolation` - negative quantity
    pub async fn set_quantity(&self, code: &str, quantity: i64) -> DbResult<()> {
        debug!(code = %code, quantity, "Setting product quantity");

        let result = sqlx::query(
            "UPDATE products SET quantity = ?2, last_sync_timestamp = ?3 WHERE code = ?1",
        )
        .bind(code)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", code));
        }

        Ok(())
    }

    /// Deletes a product.
    pub async fn delete(&self, code: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE code = ?1")
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", code));
        }

        debug!(code = %code, "Product deleted");
        Ok(())
    }

    /// Counts cached products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes every cached product, returning how many were removed.
    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM products")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
