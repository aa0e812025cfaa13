//! # Booking Service
//!
//! Owns the pool and wires every booking component. Transport layers
//! (HTTP handlers, CLIs) hold one `BookingService` and call into it.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BookingConfig::load(..)                                               │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  BookingService::start(config, notifier)                               │
//! │        │  • Database::new(config.db_config())   pool + migrations      │
//! │        │  • NotificationDispatcher::spawn        (if enabled)          │
//! │        │  • AvailabilityChecker / SlotCapacityChecker / Orchestrator   │
//! │        ▼                                                                │
//! │  .with_payment_gateway(gateway)                  (optional)            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  create_order / pay_and_create_order / check_cart / calendar / ...     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  shutdown()   drains notifications, closes the pool                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use haul_core::availability::{Availability, DateWindow};
use haul_core::slots::DaySlots;
use haul_core::validation::validate_cart;
use haul_core::{CartItem, Order, OrderAddressLink, OrderItem, Reservation, SlotKind};
use haul_db::Database;

use crate::availability::{AvailabilityChecker, Shortage};
use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::notify::{NotificationDispatcher, NotificationHandle, Notifier, OrderConfirmed};
use crate::orchestrator::{CommittedOrder, CreateOrderRequest, OrderOrchestrator};
use crate::payment::{PaidOrder, PaymentGatedCheckout, PaymentGateway, PaymentRequest};
use crate::slots::SlotCapacityChecker;

// =============================================================================
// Read Models
// =============================================================================

/// Result of a cart pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCheck {
    pub available: bool,
    pub shortages: Vec<Shortage>,
}

/// Everything stored for one order, looked up by folio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order: Order,
    pub addresses: Option<OrderAddressLink>,
    pub items: Vec<OrderItem>,
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub database_ok: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
}

// =============================================================================
// Service
// =============================================================================

pub struct BookingService {
    db: Database,
    config: Arc<BookingConfig>,
    availability: AvailabilityChecker,
    slots: SlotCapacityChecker,
    orchestrator: OrderOrchestrator,
    checkout: Option<PaymentGatedCheckout>,
    notifications: Option<NotificationHandle>,
    dispatcher_task: Option<JoinHandle<()>>,
}

impl BookingService {
    /// Opens the database described by `config` and starts the service.
    pub async fn start(config: BookingConfig, notifier: Arc<dyn Notifier>) -> BookingResult<Self> {
        config.validate()?;
        info!(path = ?config.database.path, "Starting booking service");
        let db = Database::new(config.db_config()).await?;
        Ok(Self::with_database(db, config, notifier))
    }

    /// Builds the service on an already opened database.
    ///
    /// Must be called inside a Tokio runtime when notifications are enabled.
    pub fn with_database(db: Database, config: BookingConfig, notifier: Arc<dyn Notifier>) -> Self {
        let (notifications, dispatcher_task) = if config.notifications.enabled {
            let (handle, task) =
                NotificationDispatcher::spawn(notifier, config.notifications.queue_capacity);
            (Some(handle), Some(task))
        } else {
            debug!("Order notifications disabled");
            (None, None)
        };

        BookingService {
            availability: AvailabilityChecker::new(db.pool().clone()),
            slots: SlotCapacityChecker::new(db.clone(), config.booking.daily_slot_cap),
            orchestrator: OrderOrchestrator::new(db.clone(), config.booking.clone()),
            checkout: None,
            notifications,
            dispatcher_task,
            config: Arc::new(config),
            db,
        }
    }

    /// Enables paid checkout through `gateway`.
    pub fn with_payment_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.checkout = Some(PaymentGatedCheckout::new(
            gateway,
            self.orchestrator.clone(),
            self.config.payment.authorize_timeout(),
        ));
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    // =========================================================================
    // Booking
    // =========================================================================

    /// Books a pre-paid order. The confirmation is queued after commit.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> BookingResult<CommittedOrder> {
        let committed = self.orchestrator.create_order(request).await?;
        self.notify(&committed);
        Ok(committed)
    }

    /// Charges through the configured gateway, then books.
    pub async fn pay_and_create_order(
        &self,
        payment: &PaymentRequest,
        request: &CreateOrderRequest,
    ) -> BookingResult<PaidOrder> {
        let checkout = self.checkout.as_ref().ok_or_else(|| {
            BookingError::PaymentUnavailable("no payment gateway configured".into())
        })?;

        let paid = checkout.pay_and_create_order(payment, request).await?;
        self.notify(&paid.order);
        Ok(paid)
    }

    fn notify(&self, order: &CommittedOrder) {
        if let Some(handle) = &self.notifications {
            handle.enqueue(OrderConfirmed::from(order));
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn is_available(
        &self,
        product_id: i64,
        quantity: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> BookingResult<Availability> {
        self.availability
            .is_available(product_id, quantity, date_start, date_end)
            .await
    }

    pub async fn has_capacity(&self, date: NaiveDate, kind: SlotKind) -> BookingResult<bool> {
        self.slots.has_capacity(date, kind).await
    }

    pub async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> BookingResult<Vec<DaySlots>> {
        self.slots.calendar(start, end).await
    }

    /// Checks a cart against current stock without booking anything.
    ///
    /// Unlike the commit path this reports every short leaf, not only the
    /// first one. The answer may be stale by the time an order is placed.
    pub async fn check_cart(
        &self,
        cart: &[CartItem],
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> BookingResult<CartCheck> {
        validate_cart(cart, self.config.booking.max_cart_items)?;
        let window = DateWindow::new(date_start, date_end)?;
        let catalog = self.db.products().load_catalog().await?;
        let needs = catalog.expand_cart(cart)?;

        let shortages = self.availability.shortages(&needs, &window).await?;
        Ok(CartCheck {
            available: shortages.is_empty(),
            shortages,
        })
    }

    /// Looks an order up by its folio.
    pub async fn order_summary(&self, folio: &str) -> BookingResult<Option<OrderSummary>> {
        let orders = self.db.orders();
        let Some(order) = orders.find_by_folio(folio).await? else {
            return Ok(None);
        };

        let addresses = orders.get_address_link(order.id).await?;
        let items = orders.get_items(order.id).await?;
        let reservations = self.db.reservations().list_for_order(order.id).await?;

        Ok(Some(OrderSummary {
            order,
            addresses,
            items,
            reservations,
        }))
    }

    /// A user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> BookingResult<Vec<Order>> {
        Ok(self.db.orders().list_for_user(user_id).await?)
    }

    pub async fn health(&self) -> BookingResult<HealthReport> {
        let database_ok = self.db.health_check().await;
        let (migrations_total, migrations_applied) = self.db.migration_status().await?;
        Ok(HealthReport {
            database_ok,
            migrations_total,
            migrations_applied,
        })
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Delivers queued confirmations, then closes the pool.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.notifications.take() {
            handle.shutdown().await;
        }
        if let Some(task) = self.dispatcher_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Notification dispatcher ended abnormally");
            }
        }
        self.db.close().await;
        info!("Booking service stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::notify::NotifyError;
    use crate::payment::{Authorization, AuthorizationStatus, GatewayError};
    use crate::test_support::{add_bundle, d, db_with_supplies, item, request};

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<String>>,
        attempts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Outbox {
        async fn order_confirmed(&self, event: &OrderConfirmed) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotifyError::Delivery("mailbox unavailable".into()));
            }
            self.sent.lock().unwrap().push(event.folio.clone());
            Ok(())
        }
    }

    struct ApproveAll;

    #[async_trait]
    impl PaymentGateway for ApproveAll {
        async fn authorize(&self, _: &PaymentRequest) -> Result<Authorization, GatewayError> {
            Ok(Authorization {
                status: AuthorizationStatus::Approved,
                confirmation_id: "PAY-OK".into(),
                detail: String::new(),
            })
        }
    }

    async fn service(outbox: Arc<Outbox>) -> BookingService {
        let db = db_with_supplies(&[(1, "Caja mediana", 10), (2, "Cinta", 4)]).await;
        add_bundle(&db, 100, "Kit Depa", &[(1, 2), (2, 1)]).await;
        BookingService::with_database(db, BookingConfig::default(), outbox)
    }

    #[tokio::test]
    async fn test_confirmation_sent_after_commit() {
        let outbox = Arc::new(Outbox::default());
        let service = service(outbox.clone()).await;

        let committed = service
            .create_order(&request(vec![item(100, "Kit Depa", 2)], "2024-06-01", "2024-06-03"))
            .await
            .unwrap();
        service.shutdown().await;

        assert_eq!(*outbox.sent.lock().unwrap(), vec![committed.folio]);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_affect_order() {
        let outbox = Arc::new(Outbox {
            fail: true,
            ..Default::default()
        });
        let service = service(outbox.clone()).await;

        let committed = service
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-03"))
            .await
            .unwrap();
        let summary = service.order_summary(&committed.folio).await.unwrap();
        assert!(summary.is_some());
        service.shutdown().await;

        assert_eq!(outbox.attempts.load(Ordering::SeqCst), 1);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_confirmation_for_rejected_order() {
        let outbox = Arc::new(Outbox::default());
        let service = service(outbox.clone()).await;

        let err = service
            .create_order(&request(vec![item(2, "Cinta", 5)], "2024-06-01", "2024-06-03"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        service.shutdown().await;

        assert_eq!(outbox.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_order_summary_by_folio() {
        let service = service(Arc::new(Outbox::default())).await;

        let committed = service
            .create_order(&request(
                vec![item(100, "Kit Depa", 1), item(2, "Cinta", 1)],
                "2024-06-01",
                "2024-06-03",
            ))
            .await
            .unwrap();

        let summary = service.order_summary(&committed.folio).await.unwrap().unwrap();
        assert_eq!(summary.order.id, committed.order_id);
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.reservations.len(), 2);
        assert_eq!(summary.addresses.unwrap().pickup_address_id, 12);
        assert!(summary
            .reservations
            .iter()
            .all(|r| r.date_end == d("2024-06-04")));

        assert!(service.order_summary("GH-NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_cart_reports_all_shortages() {
        let service = service(Arc::new(Outbox::default())).await;
        let cart = vec![item(100, "Kit Depa", 5), item(2, "Cinta", 1)];

        // Kit Depa ×5 needs 10 cajas and 5 cintas; plus one more cinta.
        let check = service
            .check_cart(&cart, d("2024-06-01"), d("2024-06-03"))
            .await
            .unwrap();
        assert!(!check.available);
        assert_eq!(check.shortages.len(), 1);
        assert_eq!(check.shortages[0].product_id, 2);
        assert_eq!(check.shortages[0].requested, 6);
        assert_eq!(check.shortages[0].available, 4);

        let check = service
            .check_cart(&[item(100, "Kit Depa", 2)], d("2024-06-01"), d("2024-06-03"))
            .await
            .unwrap();
        assert!(check.available);
        assert!(check.shortages.is_empty());
    }

    #[tokio::test]
    async fn test_orders_for_user_and_calendar() {
        let service = service(Arc::new(Outbox::default())).await;

        let first = service
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-03"))
            .await
            .unwrap();
        let second = service
            .create_order(&request(vec![item(1, "Caja mediana", 1)], "2024-06-02", "2024-06-03"))
            .await
            .unwrap();

        let orders = service.orders_for_user(7).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].folio, second.folio);
        assert_eq!(orders[1].folio, first.folio);
        assert!(service.orders_for_user(8).await.unwrap().is_empty());

        let calendar = service.calendar(d("2024-06-01"), d("2024-06-03")).await.unwrap();
        assert_eq!(calendar[0].deliveries, 1);
        assert_eq!(calendar[1].deliveries, 1);
        assert_eq!(calendar[2].pickups, 2);
        assert_eq!(calendar[2].pickups_available, 1);
        assert!(service.has_capacity(d("2024-06-03"), SlotKind::Pickup).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleaning_day_through_the_service() {
        let db = db_with_supplies(&[(3, "Diablito", 1)]).await;
        let outbox = Arc::new(Outbox::default());
        let service = BookingService::with_database(db, BookingConfig::default(), outbox);

        service
            .create_order(&request(vec![item(3, "Diablito", 1)], "2024-06-01", "2024-06-03"))
            .await
            .unwrap();

        let d_plus_1 = service.is_available(3, 1, d("2024-06-04"), d("2024-06-04")).await.unwrap();
        let d_plus_2 = service.is_available(3, 1, d("2024-06-05"), d("2024-06-05")).await.unwrap();
        assert!(!d_plus_1.available);
        assert!(d_plus_2.available);

        let err = service
            .create_order(&request(vec![item(3, "Diablito", 1)], "2024-06-04", "2024-06-06"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InsufficientInventory { product_id: 3, .. }));

        service
            .create_order(&request(vec![item(3, "Diablito", 1)], "2024-06-05", "2024-06-06"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_paid_checkout_requires_gateway() {
        let outbox = Arc::new(Outbox::default());
        let service = service(outbox.clone()).await;
        let payment = PaymentRequest {
            amount_cents: 15_000,
            token: "tok".into(),
            payer: "cliente@example.com".into(),
        };
        let req = request(vec![item(1, "Caja mediana", 1)], "2024-06-01", "2024-06-03");

        assert!(matches!(
            service.pay_and_create_order(&payment, &req).await,
            Err(BookingError::PaymentUnavailable(_))
        ));

        let service = service.with_payment_gateway(Arc::new(ApproveAll));
        let paid = service.pay_and_create_order(&payment, &req).await.unwrap();
        assert_eq!(paid.payment_confirmation, "PAY-OK");
        service.shutdown().await;

        assert_eq!(*outbox.sent.lock().unwrap(), vec![paid.order.folio]);
    }

    #[tokio::test]
    async fn test_start_opens_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BookingConfig::default();
        config.database.path = dir.path().join("booking.db");
        config.notifications.enabled = false;

        let service = BookingService::start(config, Arc::new(crate::notify::LogNotifier))
            .await
            .unwrap();
        let health = service.health().await.unwrap();
        assert!(health.database_ok);
        assert_eq!(health.migrations_total, health.migrations_applied);
        service.shutdown().await;
    }
}
