//! # Order Transaction Orchestrator
//!
//! The only writer of orders, address links, reservations and order items.
//! Everything an order needs is checked and written inside one transaction.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         create_order(request)                           │
//! │                                                                         │
//! │  validate request ──► load catalog ──► expand cart into leaf needs     │
//! │                                                                         │
//! │  BEGIN ────────────────────────────────────────────────────────────┐   │
//! │  │ 1. lock every leaf (sorted by id)      takes the write lock     │   │
//! │  │ 2. availability for every leaf         InsufficientInventory    │   │
//! │  │ 3. delivery slot, pickup slot          SlotFull                 │   │
//! │  │ 4. INSERT orders (fresh folio)         DuplicateFolio           │   │
//! │  │ 5. INSERT order_addresses                                       │   │
//! │  │ 6. INSERT reservations (end + cleaning days), one per leaf      │   │
//! │  │ 7. INSERT order_items, one per cart line                        │   │
//! │  COMMIT ◄──────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Any error, or the timeout firing before COMMIT, drops the             │
//! │  transaction and SQLite rolls all of it back. COMMIT itself is         │
//! │  not timed.                                                            │
//! │                                                                         │
//! │  DuplicateFolio ──► one more attempt with a new folio, new transaction │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! Step 1 is an UPDATE, so the transaction holds SQLite's write lock before
//! it reads stock, reservations or slot counts. A second booking blocks at
//! its own step 1 (up to the busy timeout) and then sees the first one's
//! rows. The catalog is read before `BEGIN` because it is never written by
//! a booking.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use haul_core::availability::{extend_for_cleaning, DateWindow};
use haul_core::folio::generate_folio;
use haul_core::validation::{
    validate_addresses, validate_amount_cents, validate_cart, validate_rental_dates, RentalDates,
};
use haul_core::{CartItem, OrderStatus, SlotKind};
use haul_db::{
    Database, NewOrder, NewReservation, OrderRepository, ProductRepository, ReservationRepository,
};

use crate::availability::AvailabilityChecker;
use crate::config::BookingSettings;
use crate::error::{BookingError, BookingResult};
use crate::slots::SlotCapacityChecker;

/// Folio attempts per order: the first one plus one retry.
const FOLIO_ATTEMPTS: u32 = 2;

// =============================================================================
// Request
// =============================================================================

/// Everything needed to book an order.
///
/// Optional fields are optional on the wire only. [`CreateOrderRequest::validate`]
/// rejects the request if any is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub cart_items: Vec<CartItem>,
    pub delivery_address_id: Option<i64>,
    pub pickup_address_id: Option<i64>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
    /// Charged total. May exceed the item subtotal (delivery fees).
    pub total_amount_cents: i64,
}

impl CreateOrderRequest {
    /// Checks the request shape. Does not touch the database.
    pub fn validate(&self, max_cart_items: usize) -> BookingResult<ValidatedOrder> {
        let (delivery_address_id, pickup_address_id) =
            validate_addresses(self.delivery_address_id, self.pickup_address_id)?;
        let dates = validate_rental_dates(
            self.date_start,
            self.date_end,
            self.delivery_date,
            self.pickup_date,
        )?;
        validate_cart(&self.cart_items, max_cart_items)?;
        validate_amount_cents("total_amount", self.total_amount_cents)
            .map_err(|e| BookingError::invalid_cart(e.to_string()))?;

        Ok(ValidatedOrder {
            user_id: self.user_id,
            items: self.cart_items.clone(),
            delivery_address_id,
            pickup_address_id,
            dates,
            total_cents: self.total_amount_cents,
        })
    }
}

/// A request that passed [`CreateOrderRequest::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub user_id: i64,
    pub items: Vec<CartItem>,
    pub delivery_address_id: i64,
    pub pickup_address_id: i64,
    pub dates: RentalDates,
    pub total_cents: i64,
}

impl ValidatedOrder {
    /// The rental window as requested, without the cleaning buffer.
    pub fn rental_window(&self) -> BookingResult<DateWindow> {
        Ok(DateWindow::new(self.dates.date_start, self.dates.date_end)?)
    }
}

/// A committed order, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedOrder {
    pub order_id: i64,
    /// External identifier; the numeric id stays internal.
    pub folio: String,
    pub user_id: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub delivery_date: NaiveDate,
    pub pickup_date: NaiveDate,
    pub payment_confirmation: Option<String>,
}

// =============================================================================
// Orchestrator
// =============================================================================

type FolioFn = dyn Fn(DateTime<Utc>) -> String + Send + Sync;

#[derive(Clone)]
pub struct OrderOrchestrator {
    db: Database,
    slots: SlotCapacityChecker,
    settings: BookingSettings,
    folio: Arc<FolioFn>,
}

impl std::fmt::Debug for OrderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderOrchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OrderOrchestrator {
    pub fn new(db: Database, settings: BookingSettings) -> Self {
        let slots = SlotCapacityChecker::new(db.clone(), settings.daily_slot_cap);
        OrderOrchestrator {
            db,
            slots,
            settings,
            folio: Arc::new(generate_folio),
        }
    }

    /// Replaces the folio generator.
    pub fn with_folio_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(DateTime<Utc>) -> String + Send + Sync + 'static,
    {
        self.folio = Arc::new(generator);
        self
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    /// Validates and commits a pre-paid order (status `activo`).
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> BookingResult<CommittedOrder> {
        let order = request.validate(self.settings.max_cart_items)?;
        self.commit(&order, OrderStatus::Activo, None).await
    }

    /// Commits an already validated order with the given status.
    ///
    /// Inventory and slots are always re-checked here, whatever the caller
    /// checked before.
    pub async fn commit(
        &self,
        order: &ValidatedOrder,
        status: OrderStatus,
        payment_confirmation: Option<String>,
    ) -> BookingResult<CommittedOrder> {
        let catalog = self.db.products().load_catalog().await?;
        let needs = catalog.expand_cart(&order.items)?;
        let window = order.rental_window()?;

        debug!(
            user_id = order.user_id,
            lines = order.items.len(),
            leaves = needs.len(),
            start = %window.start,
            end = %window.end,
            "Cart expanded"
        );

        let mut attempt = 1;

        loop {
            let folio = (self.folio)(Utc::now());
            let confirmation = payment_confirmation.clone();
            let outcome = self
                .commit_once(order, &needs, &window, &folio, status, confirmation)
                .await;

            match outcome {
                Err(BookingError::DuplicateFolio { folio }) if attempt < FOLIO_ATTEMPTS => {
                    warn!(%folio, attempt, "Folio collision, retrying with a new folio");
                    attempt += 1;
                }
                Ok(order_id) => {
                    info!(
                        %folio,
                        order_id,
                        user_id = order.user_id,
                        %status,
                        "Order committed"
                    );
                    return Ok(CommittedOrder {
                        order_id,
                        folio,
                        user_id: order.user_id,
                        total_cents: order.total_cents,
                        status,
                        delivery_date: order.dates.delivery_date,
                        pickup_date: order.dates.pickup_date,
                        payment_confirmation,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "Order not committed");
                    return Err(e);
                }
            }
        }
    }

    /// One transaction. Returns the new order id.
    ///
    /// The timeout covers `BEGIN` through the last insert. `COMMIT` runs
    /// outside it, so a `TransactionTimeout` always means nothing was
    /// written.
    async fn commit_once(
        &self,
        order: &ValidatedOrder,
        needs: &BTreeMap<i64, i64>,
        window: &DateWindow,
        folio: &str,
        status: OrderStatus,
        payment_confirmation: Option<String>,
    ) -> BookingResult<i64> {
        let timeout = self.settings.transaction_timeout();
        let staged = tokio::time::timeout(timeout, async {
            let mut tx = self.db.pool().begin().await?;
            let order_id = self
                .stage_order(&mut *tx, order, needs, window, folio, status, payment_confirmation)
                .await?;
            Ok::<_, BookingError>((tx, order_id))
        })
        .await;

        let (tx, order_id) = match staged {
            Ok(staged) => staged?,
            Err(_) => {
                warn!(%folio, ?timeout, "Booking transaction timed out, rolled back");
                return Err(BookingError::TransactionTimeout {
                    after_secs: timeout.as_secs(),
                });
            }
        };

        tx.commit().await?;
        Ok(order_id)
    }

    /// Locks, checks and writes inside `conn`'s open transaction.
    #[allow(clippy::too_many_arguments)]
    async fn stage_order(
        &self,
        conn: &mut SqliteConnection,
        order: &ValidatedOrder,
        needs: &BTreeMap<i64, i64>,
        window: &DateWindow,
        folio: &str,
        status: OrderStatus,
        payment_confirmation: Option<String>,
    ) -> BookingResult<i64> {
        for &product_id in needs.keys() {
            if !ProductRepository::lock_for_booking(&mut *conn, product_id).await? {
                return Err(BookingError::ProductNotFound { product_id });
            }
        }

        let shortages = AvailabilityChecker::shortages_on(&mut *conn, needs, window).await?;
        if let Some(shortage) = shortages.into_iter().next() {
            return Err(shortage.into());
        }

        self.slots
            .ensure_capacity_on(&mut *conn, order.dates.delivery_date, SlotKind::Delivery)
            .await?;
        self.slots
            .ensure_capacity_on(&mut *conn, order.dates.pickup_date, SlotKind::Pickup)
            .await?;

        self.write_order(conn, order, needs, folio, status, payment_confirmation)
            .await
    }

    async fn write_order(
        &self,
        conn: &mut SqliteConnection,
        order: &ValidatedOrder,
        needs: &BTreeMap<i64, i64>,
        folio: &str,
        status: OrderStatus,
        payment_confirmation: Option<String>,
    ) -> BookingResult<i64> {
        let new_order = NewOrder {
            folio: folio.to_string(),
            user_id: order.user_id,
            total_cents: order.total_cents,
            status,
            order_date: Utc::now(),
            rental_start: order.dates.date_start,
            rental_end: order.dates.date_end,
            delivery_date: order.dates.delivery_date,
            pickup_date: order.dates.pickup_date,
            payment_confirmation,
        };

        let order_id = OrderRepository::insert_on(conn, &new_order)
            .await
            .map_err(|e| {
                if e.is_unique_violation_on("orders.folio") {
                    BookingError::DuplicateFolio {
                        folio: folio.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

        OrderRepository::insert_address_link_on(
            conn,
            order_id,
            folio,
            order.delivery_address_id,
            order.pickup_address_id,
        )
        .await?;

        let stored_end = extend_for_cleaning(order.dates.date_end, self.settings.cleaning_days);
        for (&product_id, &quantity) in needs {
            ReservationRepository::insert_on(
                conn,
                &NewReservation {
                    order_id,
                    product_id,
                    quantity,
                    date_start: order.dates.date_start,
                    date_end: stored_end,
                    user_id: order.user_id,
                },
            )
            .await?;
        }

        for item in &order.items {
            OrderRepository::insert_item_on(conn, order_id, item).await?;
        }

        Ok(order_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use haul_db::{DbConfig, NewProduct};

    use crate::test_support::{add_bundle, d, db_with_supplies, item, request};

    fn orchestrator(db: &Database) -> OrderOrchestrator {
        OrderOrchestrator::new(db.clone(), BookingSettings::default())
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_bundle_order_then_overlapping_shortage() {
        let db = db_with_supplies(&[(1, "Componente A", 10)]).await;
        add_bundle(&db, 100, "B1", &[(1, 2)]).await;
        let orchestrator = orchestrator(&db);

        let first = orchestrator
            .create_order(&request(vec![item(100, "B1", 3)], "2024-06-01", "2024-06-03"))
            .await
            .unwrap();
        assert_eq!(first.status, OrderStatus::Activo);
        assert!(first.folio.starts_with("GH-"));

        let reservations = db.reservations().list_for_order(first.order_id).await.unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].product_id, 1);
        assert_eq!(reservations[0].quantity, 6);
        assert_eq!(reservations[0].date_start, d("2024-06-01"));
        assert_eq!(reservations[0].date_end, d("2024-06-04"));

        let err = orchestrator
            .create_order(&request(vec![item(1, "Componente A", 5)], "2024-06-02", "2024-06-05"))
            .await
            .unwrap_err();
        match err {
            BookingError::InsufficientInventory {
                product_id,
                requested,
                available,
                ..
            } => {
                assert_eq!(product_id, 1);
                assert_eq!(requested, 5);
                assert_eq!(available, 4);
            }
            other => panic!("expected InsufficientInventory, got {other:?}"),
        }
        assert_eq!(count(&db, "orders").await, 1);
    }

    #[tokio::test]
    async fn test_items_snapshot_cart_lines_and_reservations_follow_leaves() {
        let db = db_with_supplies(&[(1, "Caja mediana", 50), (2, "Cinta", 20)]).await;
        add_bundle(&db, 100, "Kit Depa", &[(1, 10), (2, 2)]).await;

        let committed = orchestrator(&db)
            .create_order(&request(
                vec![item(100, "  Kit Depa ", 1), item(1, "Caja mediana", 4)],
                "2024-06-01",
                "2024-06-03",
            ))
            .await
            .unwrap();

        let items = db.orders().get_items(committed.order_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_name, "Kit Depa");
        assert_eq!(items[1].quantity, 4);

        let reservations = db.reservations().list_for_order(committed.order_id).await.unwrap();
        let by_product: BTreeMap<i64, i64> = reservations
            .iter()
            .map(|r| (r.product_id, r.quantity))
            .collect();
        assert_eq!(by_product, BTreeMap::from([(1, 14), (2, 2)]));

        let link = db
            .orders()
            .get_address_link(committed.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.folio, committed.folio);
        assert_eq!(link.delivery_address_id, 11);
        assert_eq!(link.pickup_address_id, 12);
    }

    #[tokio::test]
    async fn test_fourth_delivery_on_a_day_is_refused() {
        let db = db_with_supplies(&[(1, "Caja mediana", 100)]).await;
        let orchestrator = orchestrator(&db);

        for end in ["2024-06-03", "2024-06-04", "2024-06-05"] {
            orchestrator
                .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", end))
                .await
                .unwrap();
        }

        let err = orchestrator
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-06"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::SlotFull {
                kind: SlotKind::Delivery,
                ..
            }
        ));
        assert_eq!(count(&db, "orders").await, 3);
        assert_eq!(count(&db, "reservations").await, 3);
    }

    #[tokio::test]
    async fn test_pickup_slot_is_checked_separately() {
        let db = db_with_supplies(&[(1, "Caja mediana", 100)]).await;
        let orchestrator = orchestrator(&db);

        for start in ["2024-06-01", "2024-06-02", "2024-06-03"] {
            orchestrator
                .create_order(&request(vec![item(1, "Caja mediana", 1)], start, "2024-06-10"))
                .await
                .unwrap();
        }

        let err = orchestrator
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-04", "2024-06-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotFull { kind: SlotKind::Pickup, .. }));
    }

    #[tokio::test]
    async fn test_failed_item_insert_leaves_nothing_behind() {
        let db = db_with_supplies(&[(1, "Caja mediana", 10), (2, "Cinta", 10)]).await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_boom BEFORE INSERT ON order_items
            WHEN NEW.product_name = 'Boom'
            BEGIN
                SELECT RAISE(ABORT, 'item rejected');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = orchestrator(&db)
            .create_order(&request(
                vec![
                    item(1, "Caja mediana", 2),
                    item(2, "Cinta", 1),
                    item(2, "Boom", 1),
                ],
                "2024-06-01",
                "2024-06-03",
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Database(_)), "{err:?}");
        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "order_addresses").await, 0);
        assert_eq!(count(&db, "reservations").await, 0);
        assert_eq!(count(&db, "order_items").await, 0);
    }

    #[tokio::test]
    async fn test_folio_collision_is_retried_once() {
        let db = db_with_supplies(&[(1, "Caja mediana", 10)]).await;
        let taken = orchestrator(&db)
            .with_folio_generator(|_| "GH-20240601-000000-AAAAAA".to_string())
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-02"))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retried = orchestrator(&db)
            .with_folio_generator(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
                0 => "GH-20240601-000000-AAAAAA".to_string(),
                _ => "GH-20240601-000000-BBBBBB".to_string(),
            })
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-05", "2024-06-06"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(retried.folio, "GH-20240601-000000-BBBBBB");
        assert_ne!(retried.order_id, taken.order_id);
    }

    #[tokio::test]
    async fn test_folio_collision_surfaces_after_retry() {
        let db = db_with_supplies(&[(1, "Caja mediana", 10)]).await;
        let orchestrator = orchestrator(&db).with_folio_generator(|_| "GH-FIXED".to_string());

        orchestrator
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-02"))
            .await
            .unwrap();
        let err = orchestrator
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-05", "2024-06-06"))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::DuplicateFolio { ref folio } if folio == "GH-FIXED"));
        assert!(err.is_retryable());
        assert_eq!(count(&db, "orders").await, 1);
        assert_eq!(count(&db, "reservations").await, 1);
    }

    #[tokio::test]
    async fn test_request_validation_runs_before_any_io() {
        let db = db_with_supplies(&[(1, "Caja mediana", 10)]).await;
        let orchestrator = orchestrator(&db);

        let mut req = request(vec![], "2024-06-01", "2024-06-03");
        assert!(matches!(
            orchestrator.create_order(&req).await,
            Err(BookingError::InvalidCart { .. })
        ));

        req.cart_items = vec![item(1, "Caja mediana", 1)];
        req.pickup_address_id = None;
        assert!(matches!(
            orchestrator.create_order(&req).await,
            Err(BookingError::AddressRequired { ref kind }) if kind == "Pickup"
        ));

        req.pickup_address_id = Some(12);
        req.date_end = None;
        assert!(matches!(
            orchestrator.create_order(&req).await,
            Err(BookingError::DateRangeRequired { ref field }) if field == "date_end"
        ));

        req.date_end = Some(d("2024-06-03"));
        req.total_amount_cents = -1;
        assert!(matches!(
            orchestrator.create_order(&req).await,
            Err(BookingError::InvalidCart { .. })
        ));

        assert_eq!(count(&db, "orders").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_leaf_and_undefined_bundle() {
        let db = db_with_supplies(&[(1, "Caja mediana", 10)]).await;
        db.products()
            .insert(&NewProduct::bundle(200, "Kit vacío", 5_000))
            .await
            .unwrap();
        let orchestrator = orchestrator(&db);

        let err = orchestrator
            .create_order(&request(vec![item(42, "Fantasma", 1)], "2024-06-01", "2024-06-02"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ProductNotFound { product_id: 42 }));

        let err = orchestrator
            .create_order(&request(vec![item(200, "Kit vacío", 1)], "2024-06-01", "2024-06-02"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidComposition { bundle_id: 200, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(8))
            .await
            .unwrap();
        db.products()
            .insert(&NewProduct::standalone(1, "Diablito", 9_000, 10))
            .await
            .unwrap();

        let orchestrator = orchestrator(&db);
        let mut handles = Vec::new();
        for i in 0..8u32 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                // Distinct logistics days so only stock can refuse an order.
                let mut req = request(vec![item(1, "Diablito", 3)], "2024-06-01", "2024-06-03");
                req.delivery_date = Some(d("2024-05-01") + chrono::Days::new(i.into()));
                req.pickup_date = Some(d("2024-06-10") + chrono::Days::new(i.into()));
                orchestrator.create_order(&req).await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(BookingError::InsufficientInventory { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(committed, 3);
        assert_eq!(db.reservations().total_active_quantity(1).await.unwrap(), 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_transaction_timeout_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            DbConfig::new(dir.path().join("slow.db"))
                .max_connections(4)
                .busy_timeout(Duration::from_secs(3)),
        )
        .await
        .unwrap();
        db.products()
            .insert(&NewProduct::standalone(1, "Caja mediana", 2_500, 10))
            .await
            .unwrap();

        // Another writer holds the lock for longer than the booking may wait.
        let mut blocker = db.pool().begin().await.unwrap();
        sqlx::query("UPDATE products SET stock = stock WHERE id = 1")
            .execute(&mut *blocker)
            .await
            .unwrap();

        let mut settings = BookingSettings::default();
        settings.transaction_timeout_secs = 1;
        let orchestrator = OrderOrchestrator::new(db.clone(), settings);

        let err = orchestrator
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-02"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::TransactionTimeout { after_secs: 1 }));

        blocker.rollback().await.unwrap();
        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "reservations").await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_wait_inside_timeout_still_commits() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            DbConfig::new(dir.path().join("wait.db"))
                .max_connections(4)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();
        db.products()
            .insert(&NewProduct::standalone(1, "Caja mediana", 2_500, 10))
            .await
            .unwrap();

        let mut blocker = db.pool().begin().await.unwrap();
        sqlx::query("UPDATE products SET stock = stock WHERE id = 1")
            .execute(&mut *blocker)
            .await
            .unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            blocker.rollback().await.unwrap();
        });

        let mut settings = BookingSettings::default();
        settings.transaction_timeout_secs = 3;
        let committed = OrderOrchestrator::new(db.clone(), settings)
            .create_order(&request(
                vec![item(1, "Caja mediana", 1)],
                "2024-06-01",
                "2024-06-02",
            ))
            .await
            .unwrap();
        release.await.unwrap();

        let stored = db.orders().find_by_folio(&committed.folio).await.unwrap();
        assert_eq!(stored.map(|o| o.id), Some(committed.order_id));
        assert_eq!(count(&db, "reservations").await, 1);
    }
}
