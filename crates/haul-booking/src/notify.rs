//! # Order Notifications
//!
//! Confirmation messages sent after an order commits.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BookingService ──commit ok──► NotificationHandle::enqueue (try_send)  │
//! │                                        │                                │
//! │                                        │  bounded mpsc                  │
//! │                                        ▼                                │
//! │                              NotificationDispatcher::run               │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                              Notifier::order_confirmed                 │
//! │                                                                         │
//! │  • enqueue never waits: a full queue drops the message with a warning  │
//! │  • a failing notifier is logged and skipped                            │
//! │  • the booking result is decided before any of this runs               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use haul_core::OrderStatus;

use crate::orchestrator::CommittedOrder;

// =============================================================================
// Messages
// =============================================================================

/// Payload of an order confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub folio: String,
    pub user_id: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub delivery_date: NaiveDate,
    pub pickup_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_confirmation: Option<String>,
}

impl From<&CommittedOrder> for OrderConfirmed {
    fn from(order: &CommittedOrder) -> Self {
        OrderConfirmed {
            folio: order.folio.clone(),
            user_id: order.user_id,
            total_cents: order.total_cents,
            status: order.status,
            delivery_date: order.delivery_date,
            pickup_date: order.pickup_date,
            payment_confirmation: order.payment_confirmation.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Outbound channel for confirmations (email in production).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_confirmed(&self, event: &OrderConfirmed) -> Result<(), NotifyError>;
}

/// Writes confirmations to the log. Default when no mailer is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_confirmed(&self, event: &OrderConfirmed) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)?;
        info!(folio = %event.folio, user_id = event.user_id, %payload, "Order confirmation");
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Background task delivering confirmations one at a time.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    rx: mpsc::Receiver<OrderConfirmed>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for feeding and stopping the dispatcher.
#[derive(Clone)]
pub struct NotificationHandle {
    tx: mpsc::Sender<OrderConfirmed>,
    shutdown_tx: mpsc::Sender<()>,
}

impl NotificationHandle {
    /// Queues a confirmation without waiting. Returns `false` when it was
    /// dropped.
    pub fn enqueue(&self, event: OrderConfirmed) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(folio = %event.folio, "Notification queue full, confirmation dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    folio = %event.folio,
                    "Notification dispatcher stopped, confirmation dropped"
                );
                false
            }
        }
    }

    /// Asks the dispatcher to deliver what is queued and stop.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Notification dispatcher already stopped");
        }
    }
}

impl NotificationDispatcher {
    /// Creates a dispatcher and its handle.
    pub fn new(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, NotificationHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        (
            NotificationDispatcher {
                notifier,
                rx,
                shutdown_rx,
            },
            NotificationHandle { tx, shutdown_tx },
        )
    }

    /// Spawns the dispatcher on the current runtime.
    pub fn spawn(
        notifier: Arc<dyn Notifier>,
        capacity: usize,
    ) -> (NotificationHandle, JoinHandle<()>) {
        let (dispatcher, handle) = Self::new(notifier, capacity);
        (handle, tokio::spawn(dispatcher.run()))
    }

    /// Runs until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) {
        info!("Notification dispatcher started");

        loop {
            tokio::select! {
                Some(event) = self.rx.recv() => {
                    self.deliver(&event).await;
                }
                _ = self.shutdown_rx.recv() => {
                    self.rx.close();
                    while let Ok(event) = self.rx.try_recv() {
                        self.deliver(&event).await;
                    }
                    break;
                }
                else => break,
            }
        }

        info!("Notification dispatcher stopped");
    }

    async fn deliver(&self, event: &OrderConfirmed) {
        match self.notifier.order_confirmed(event).await {
            Ok(()) => debug!(folio = %event.folio, "Confirmation sent"),
            Err(e) => warn!(folio = %event.folio, error = %e, "Confirmation failed"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::test_support::d;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn order_confirmed(&self, event: &OrderConfirmed) -> Result<(), NotifyError> {
            if self.fail_on.as_deref() == Some(event.folio.as_str()) {
                return Err(NotifyError::Delivery("smtp timeout".into()));
            }
            self.seen.lock().unwrap().push(event.folio.clone());
            Ok(())
        }
    }

    fn event(folio: &str) -> OrderConfirmed {
        OrderConfirmed {
            folio: folio.to_string(),
            user_id: 7,
            total_cents: 15_000,
            status: OrderStatus::Activo,
            delivery_date: d("2024-06-01"),
            pickup_date: d("2024-06-03"),
            payment_confirmation: None,
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_the_queue() {
        let recorder = Arc::new(Recorder {
            fail_on: Some("GH-2".into()),
            ..Default::default()
        });
        let (handle, task) = NotificationDispatcher::spawn(recorder.clone(), 8);

        assert!(handle.enqueue(event("GH-1")));
        assert!(handle.enqueue(event("GH-2")));
        assert!(handle.enqueue(event("GH-3")));
        handle.shutdown().await;
        task.await.unwrap();

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["GH-1", "GH-3"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_waiting() {
        let recorder = Arc::new(Recorder::default());
        // Not spawned: nothing drains the queue.
        let (_dispatcher, handle) = NotificationDispatcher::new(recorder, 1);

        assert!(handle.enqueue(event("GH-1")));
        assert!(!handle.enqueue(event("GH-2")));
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_dropped() {
        let (handle, task) = NotificationDispatcher::spawn(Arc::new(LogNotifier), 4);
        handle.shutdown().await;
        task.await.unwrap();

        assert!(!handle.enqueue(event("GH-late")));
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(event("GH-1")).unwrap();
        assert_eq!(json["folio"], "GH-1");
        assert_eq!(json["status"], "activo");
        assert_eq!(json["delivery_date"], "2024-06-01");
        assert!(json.get("payment_confirmation").is_none());
    }
}
