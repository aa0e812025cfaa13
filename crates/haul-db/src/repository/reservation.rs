//! # Reservation Ledger
//!
//! Durable record of date-scoped holds on leaf products. The availability
//! checker reads it; only the order orchestrator writes it.
//!
//! ## Overlap Query
//! ```text
//!   stored:     [date_start ─────────── date_end]      (end includes cleaning)
//!   requested:              [start ─────────── end]
//!
//!   overlap  ⇔  NOT (date_end < start OR date_start > end)
//! ```
//!
//! ISO-8601 date text compares correctly as strings, so the predicate runs
//! directly against the `idx_reservations_product_window` index.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use haul_core::availability::DateWindow;
use haul_core::{Reservation, ReservationStatus};

/// A reservation about to be written. `date_end` must already include
/// the cleaning buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub user_id: i64,
}

/// Repository for reservation ledger operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Sum of active reserved quantity for `product_id` overlapping `window`.
    pub async fn reserved_quantity(&self, product_id: i64, window: &DateWindow) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::reserved_quantity_on(&mut conn, product_id, window).await
    }

    /// Reservations of an order, in insertion order.
    pub async fn list_for_order(&self, order_id: i64) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, order_id, product_id, quantity, date_start, date_end, user_id, status
            FROM reservations
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    /// Active reservations of a product overlapping `window`.
    pub async fn list_active_for_product(
        &self,
        product_id: i64,
        window: &DateWindow,
    ) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, order_id, product_id, quantity, date_start, date_end, user_id, status
            FROM reservations
            WHERE product_id = ?1
              AND status = 'active'
              AND NOT (date_end < ?2 OR date_start > ?3)
            ORDER BY date_start, id
            "#,
        )
        .bind(product_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    /// Total quantity held in active reservations across the whole ledger.
    pub async fn total_active_quantity(&self, product_id: i64) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM reservations
            WHERE product_id = ?1 AND status = 'active'
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Moves a reservation out of `active`. Administrative path only.
    pub async fn set_status(&self, id: i64, status: ReservationStatus) -> DbResult<bool> {
        let result = sqlx::query("UPDATE reservations SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Connection-scoped helpers (run inside a caller's transaction)
    // =========================================================================

    pub async fn reserved_quantity_on(
        conn: &mut SqliteConnection,
        product_id: i64,
        window: &DateWindow,
    ) -> DbResult<i64> {
        let reserved: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM reservations
            WHERE product_id = ?1
              AND status = 'active'
              AND NOT (date_end < ?2 OR date_start > ?3)
            "#,
        )
        .bind(product_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(conn)
        .await?;

        Ok(reserved)
    }

    /// Writes one active reservation and returns its id.
    pub async fn insert_on(
        conn: &mut SqliteConnection,
        reservation: &NewReservation,
    ) -> DbResult<i64> {
        debug!(
            order_id = reservation.order_id,
            product_id = reservation.product_id,
            quantity = reservation.quantity,
            date_start = %reservation.date_start,
            date_end = %reservation.date_end,
            "Inserting reservation"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                order_id, product_id, quantity, date_start, date_end, user_id, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(reservation.order_id)
        .bind(reservation.product_id)
        .bind(reservation.quantity)
        .bind(reservation.date_start)
        .bind(reservation.date_end)
        .bind(reservation.user_id)
        .bind(ReservationStatus::Active)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::{NewOrder, OrderRepository};
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use haul_core::OrderStatus;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(d(start), d(end)).unwrap()
    }

    async fn db_with_order() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&NewProduct::standalone(1, "Caja mediana", 2_500, 10))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let order_id = OrderRepository::insert_on(
            &mut conn,
            &NewOrder {
                folio: "GH-TEST-000001".to_string(),
                user_id: 7,
                total_cents: 15_000,
                status: OrderStatus::Activo,
                order_date: Utc::now(),
                rental_start: d("2024-06-01"),
                rental_end: d("2024-06-03"),
                delivery_date: d("2024-06-01"),
                pickup_date: d("2024-06-03"),
                payment_confirmation: None,
            },
        )
        .await
        .unwrap();
        drop(conn);

        (db, order_id)
    }

    async fn reserve(db: &Database, order_id: i64, qty: i64, start: &str, end: &str) -> i64 {
        let mut conn = db.pool().acquire().await.unwrap();
        ReservationRepository::insert_on(
            &mut conn,
            &NewReservation {
                order_id,
                product_id: 1,
                quantity: qty,
                date_start: d(start),
                date_end: d(end),
                user_id: 7,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_reserved_quantity_counts_inclusive_overlaps() {
        let (db, order_id) = db_with_order().await;
        // Rental 06-01..06-03, stored with the cleaning day.
        reserve(&db, order_id, 6, "2024-06-01", "2024-06-04").await;
        let repo = db.reservations();

        assert_eq!(
            repo.reserved_quantity(1, &window("2024-06-04", "2024-06-04")).await.unwrap(),
            6
        );
        assert_eq!(
            repo.reserved_quantity(1, &window("2024-05-25", "2024-06-01")).await.unwrap(),
            6
        );
        assert_eq!(
            repo.reserved_quantity(1, &window("2024-06-05", "2024-06-09")).await.unwrap(),
            0
        );
        assert_eq!(
            repo.reserved_quantity(2, &window("2024-06-01", "2024-06-04")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_inactive_reservations_are_ignored() {
        let (db, order_id) = db_with_order().await;
        let first = reserve(&db, order_id, 6, "2024-06-01", "2024-06-04").await;
        reserve(&db, order_id, 2, "2024-06-02", "2024-06-05").await;
        let repo = db.reservations();
        let w = window("2024-06-02", "2024-06-03");

        assert_eq!(repo.reserved_quantity(1, &w).await.unwrap(), 8);
        assert!(repo.set_status(first, ReservationStatus::Cancelled).await.unwrap());
        assert_eq!(repo.reserved_quantity(1, &w).await.unwrap(), 2);
        assert_eq!(repo.list_active_for_product(1, &w).await.unwrap().len(), 1);
        assert_eq!(repo.total_active_quantity(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_for_order_round_trips_dates() {
        let (db, order_id) = db_with_order().await;
        reserve(&db, order_id, 6, "2024-06-01", "2024-06-04").await;

        let rows = db.reservations().list_for_order(order_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_start, d("2024-06-01"));
        assert_eq!(rows[0].date_end, d("2024-06-04"));
        assert_eq!(rows[0].status, ReservationStatus::Active);
    }
}
