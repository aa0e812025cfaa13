//! # Order Repository
//!
//! Orders, their address links and line items, plus the per-day counts the
//! slot capacity checker reads.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One booking transaction (owned by the orchestrator)                    │
//! │                                                                         │
//! │   insert_on()              → orders          (folio UNIQUE)             │
//! │   insert_address_link_on() → order_addresses (1 per order)              │
//! │   insert_item_on() × N     → order_items     (name/price snapshots)     │
//! │                                                                         │
//! │  Nothing here commits. The caller's transaction decides.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use haul_core::availability::DateWindow;
use haul_core::{CartItem, Order, OrderAddressLink, OrderItem, OrderStatus, SlotKind};

/// An order row about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub folio: String,
    pub user_id: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub rental_start: NaiveDate,
    pub rental_end: NaiveDate,
    pub delivery_date: NaiveDate,
    pub pickup_date: NaiveDate,
    pub payment_confirmation: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct DayCount {
    day: NaiveDate,
    count: i64,
}

const ORDER_COLUMNS: &str = r#"
    id, folio, user_id, total_cents, status, order_date,
    rental_start, rental_end, delivery_date, pickup_date, payment_confirmation
"#;

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Looks an order up by its public folio.
    pub async fn find_by_folio(&self, folio: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE folio = ?1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(folio)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Orders of a user, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = ?1 ORDER BY order_date DESC, id DESC",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    pub async fn get_items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn get_address_link(&self, order_id: i64) -> DbResult<Option<OrderAddressLink>> {
        let link = sqlx::query_as::<_, OrderAddressLink>(
            r#"
            SELECT id, order_id, folio, delivery_address_id, pickup_address_id
            FROM order_addresses
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Orders scheduled for `kind` on `date`, any status.
    pub async fn count_slot(&self, kind: SlotKind, date: NaiveDate) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::count_slot_on(&mut conn, kind, date).await
    }

    /// Per-day delivery and pickup counts within `window`.
    ///
    /// Days without orders are absent from the maps.
    pub async fn slot_counts(
        &self,
        window: &DateWindow,
    ) -> DbResult<(HashMap<NaiveDate, i64>, HashMap<NaiveDate, i64>)> {
        let deliveries = sqlx::query_as::<_, DayCount>(
            r#"
            SELECT delivery_date AS day, COUNT(*) AS count
            FROM orders
            WHERE delivery_date BETWEEN ?1 AND ?2
            GROUP BY delivery_date
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        let pickups = sqlx::query_as::<_, DayCount>(
            r#"
            SELECT pickup_date AS day, COUNT(*) AS count
            FROM orders
            WHERE pickup_date BETWEEN ?1 AND ?2
            GROUP BY pickup_date
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok((
            deliveries.into_iter().map(|r| (r.day, r.count)).collect(),
            pickups.into_iter().map(|r| (r.day, r.count)).collect(),
        ))
    }

    // =========================================================================
    // Connection-scoped helpers (run inside a caller's transaction)
    // =========================================================================

    pub async fn count_slot_on(
        conn: &mut SqliteConnection,
        kind: SlotKind,
        date: NaiveDate,
    ) -> DbResult<i64> {
        let sql = match kind {
            SlotKind::Delivery => "SELECT COUNT(*) FROM orders WHERE delivery_date = ?1",
            SlotKind::Pickup => "SELECT COUNT(*) FROM orders WHERE pickup_date = ?1",
        };
        let count: i64 = sqlx::query_scalar(sql).bind(date).fetch_one(conn).await?;
        Ok(count)
    }

    /// Inserts the order row and returns its internal id.
    pub async fn insert_on(conn: &mut SqliteConnection, order: &NewOrder) -> DbResult<i64> {
        debug!(folio = %order.folio, user_id = order.user_id, "Inserting order");

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                folio, user_id, total_cents, status, order_date,
                rental_start, rental_end, delivery_date, pickup_date,
                payment_confirmation
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&order.folio)
        .bind(order.user_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(order.order_date)
        .bind(order.rental_start)
        .bind(order.rental_end)
        .bind(order.delivery_date)
        .bind(order.pickup_date)
        .bind(&order.payment_confirmation)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_address_link_on(
        conn: &mut SqliteConnection,
        order_id: i64,
        folio: &str,
        delivery_address_id: i64,
        pickup_address_id: i64,
    ) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_addresses (order_id, folio, delivery_address_id, pickup_address_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(order_id)
        .bind(folio)
        .bind(delivery_address_id)
        .bind(pickup_address_id)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Snapshots one cart line as an order item.
    pub async fn insert_item_on(
        conn: &mut SqliteConnection,
        order_id: i64,
        item: &CartItem,
    ) -> DbResult<i64> {
        debug!(order_id, name = %item.name, quantity = item.quantity, "Inserting order item");

        let result = sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_name, quantity, unit_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(order_id)
        .bind(item.name.trim())
        .bind(item.quantity)
        .bind(item.price_cents)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
