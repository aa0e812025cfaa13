//! # Product Repository
//!
//! Catalog rows and bundle compositions.
//!
//! ## Catalog Loading
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                          bundle_components                    │
//! │  ┌────┬───────────┬────────┐       ┌────────┬───────────┬─────┬─────┐  │
//! │  │ id │ name      │ kind   │       │ bundle │ component │ qty │ pos │  │
//! │  ├────┼───────────┼────────┤       ├────────┼───────────┼─────┼─────┤  │
//! │  │  1 │ Caja M    │ stand. │       │   100  │     1     │  2  │  0  │  │
//! │  │  2 │ Diablito  │ stand. │       │   100  │     2     │  1  │  1  │  │
//! │  │100 │ Kit Depa  │ bundle │       └────────┴───────────┴─────┴─────┘  │
//! │  └────┴───────────┴────────┘                                            │
//! │             │                                │                          │
//! │             └──────────────┬─────────────────┘                          │
//! │                            ▼                                            │
//! │              load_catalog() → BundleCatalog                             │
//! │              (rejects nested bundles and empty kits)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Booking Lock
//! [`ProductRepository::lock_for_booking`] bumps `reservation_version`.
//! The orchestrator runs it for every touched leaf, in id order, as the
//! first statement of its transaction.

use std::collections::{HashMap, HashSet};

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use haul_core::{BundleCatalog, BundleComponent, Product, ProductKind};

/// Fields needed to create a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    /// Explicit id; catalog ids are stable across environments.
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    pub kind: ProductKind,
}

impl NewProduct {
    pub fn standalone(id: i64, name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        NewProduct {
            id,
            name: name.into(),
            price_cents,
            stock,
            kind: ProductKind::Standalone,
        }
    }

    /// Bundles own no stock of their own.
    pub fn bundle(id: i64, name: impl Into<String>, price_cents: i64) -> Self {
        NewProduct {
            id,
            name: name.into(),
            price_cents,
            stock: 0,
            kind: ProductKind::Bundle,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ComponentRow {
    bundle_id: i64,
    component_id: i64,
    quantity: i64,
}

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, kind
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists the whole catalog ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, kind
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a catalog row.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(id = product.id, name = %product.name, kind = ?product.kind, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, kind)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.kind)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id: product.id,
            name: product.name.clone(),
            price_cents: product.price_cents,
            stock: product.stock,
            kind: product.kind,
        })
    }

    /// Replaces a bundle's composition atomically.
    ///
    /// Component order is preserved through the `position` column.
    pub async fn set_composition(
        &self,
        bundle_id: i64,
        components: &[BundleComponent],
    ) -> DbResult<()> {
        debug!(bundle_id, components = components.len(), "Setting bundle composition");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bundle_components WHERE bundle_id = ?1")
            .bind(bundle_id)
            .execute(&mut *tx)
            .await?;

        for (position, component) in components.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bundle_components (bundle_id, component_id, quantity, position)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(bundle_id)
            .bind(component.component_id)
            .bind(component.quantity)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Sets the owned stock of a product.
    pub async fn update_stock(&self, id: i64, stock: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET stock = ?2 WHERE id = ?1")
            .bind(id)
            .bind(stock)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }
        Ok(())
    }

    /// Builds the bundle registry from the catalog tables.
    ///
    /// ## Errors
    /// `DbError::InvalidData` when stored compositions nest bundles or
    /// list a non-positive quantity.
    pub async fn load_catalog(&self) -> DbResult<BundleCatalog> {
        let bundle_ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE kind = 'bundle'")
                .fetch_all(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ComponentRow>(
            r#"
            SELECT bundle_id, component_id, quantity
            FROM bundle_components
            ORDER BY bundle_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut compositions: HashMap<i64, Vec<BundleComponent>> = HashMap::new();
        for row in rows {
            compositions
                .entry(row.bundle_id)
                .or_default()
                .push(BundleComponent::new(row.component_id, row.quantity));
        }

        debug!(
            bundles = bundle_ids.len(),
            compositions = compositions.len(),
            "Loaded bundle catalog"
        );

        let bundle_ids: HashSet<i64> = bundle_ids.into_iter().collect();
        Ok(BundleCatalog::with_bundle_ids(compositions, bundle_ids)?)
    }

    // =========================================================================
    // Connection-scoped helpers (run inside a caller's transaction)
    // =========================================================================

    /// Current stock of a product, `None` if it does not exist.
    pub async fn stock_on(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(stock)
    }

    /// Name and stock of a product, for error reporting.
    pub async fn get_on(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, stock, kind FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(product)
    }

    /// Takes the booking lock on one leaf product.
    ///
    /// Returns `false` when the product does not exist. On SQLite the
    /// first such UPDATE acquires the database write lock; concurrent
    /// bookings wait on it for up to the busy timeout.
    pub async fn lock_for_booking(conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET reservation_version = reservation_version + 1 WHERE id = ?1",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
