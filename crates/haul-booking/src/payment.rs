//! # Payment-Gated Checkout
//!
//! Authorizes a charge with the external gateway, then commits the order.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PENDING ──authorize──► PAYMENT_AUTHORIZED ──commit ok──► ORDER_COMMITTED│
//! │     │                          │                                        │
//! │     │ declined                 │ commit failed                          │
//! │     ▼                          ▼                                        │
//! │  PAYMENT_DECLINED          ORDER_FAILED                                 │
//! │  (nothing written)         (money moved, no order:                      │
//! │                             PostPaymentPersistence + confirmation id)   │
//! │                                                                         │
//! │  Timeout or gateway error while PENDING: nothing written, no state     │
//! │  change.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway call happens before any transaction is opened, so no lock
//! is held while it is in flight. Inventory and slots are checked again by
//! the orchestrator after authorization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use haul_core::OrderStatus;

use crate::error::{BookingError, BookingResult};
use crate::orchestrator::{CommittedOrder, CreateOrderRequest, OrderOrchestrator};

// =============================================================================
// Gateway Boundary
// =============================================================================

/// What is sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
    /// Card or wallet token produced by the storefront.
    pub token: String,
    /// Payer email or identifier, passed through untouched.
    pub payer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Approved,
    Declined,
}

/// The gateway's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub status: AuthorizationStatus,
    pub confirmation_id: String,
    #[serde(default)]
    pub detail: String,
}

/// Transport-level gateway failures. A decline is not an error.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

/// External payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, request: &PaymentRequest) -> Result<Authorization, GatewayError>;
}

// =============================================================================
// Checkout State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutState {
    Pending,
    PaymentAuthorized,
    OrderCommitted,
    OrderFailed,
    PaymentDeclined,
}

impl CheckoutState {
    /// Final state reached by a checkout attempt.
    pub fn of(result: &BookingResult<PaidOrder>) -> Self {
        match result {
            Ok(_) => CheckoutState::OrderCommitted,
            Err(BookingError::PaymentDeclined { .. }) => CheckoutState::PaymentDeclined,
            Err(BookingError::PostPaymentPersistence { .. }) => CheckoutState::OrderFailed,
            Err(_) => CheckoutState::Pending,
        }
    }

    /// True when money may have moved.
    pub fn is_charged(&self) -> bool {
        matches!(
            self,
            CheckoutState::PaymentAuthorized
                | CheckoutState::OrderCommitted
                | CheckoutState::OrderFailed
        )
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutState::Pending => write!(f, "PENDING"),
            CheckoutState::PaymentAuthorized => write!(f, "PAYMENT_AUTHORIZED"),
            CheckoutState::OrderCommitted => write!(f, "ORDER_COMMITTED"),
            CheckoutState::OrderFailed => write!(f, "ORDER_FAILED"),
            CheckoutState::PaymentDeclined => write!(f, "PAYMENT_DECLINED"),
        }
    }
}

/// A paid and committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidOrder {
    pub order: CommittedOrder,
    pub payment_confirmation: String,
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Clone)]
pub struct PaymentGatedCheckout {
    gateway: Arc<dyn PaymentGateway>,
    orchestrator: OrderOrchestrator,
    authorize_timeout: Duration,
}

impl PaymentGatedCheckout {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        orchestrator: OrderOrchestrator,
        authorize_timeout: Duration,
    ) -> Self {
        PaymentGatedCheckout {
            gateway,
            orchestrator,
            authorize_timeout,
        }
    }

    /// Charges, then books.
    ///
    /// The request shape and the charged amount are checked first so an
    /// obviously bad order never reaches the gateway. After a successful
    /// authorization every failure is reported as `PostPaymentPersistence`
    /// and never retried.
    pub async fn pay_and_create_order(
        &self,
        payment: &PaymentRequest,
        request: &CreateOrderRequest,
    ) -> BookingResult<PaidOrder> {
        let order = request.validate(self.orchestrator.settings().max_cart_items)?;
        if payment.amount_cents != order.total_cents {
            return Err(BookingError::PaymentAmountMismatch {
                charged_cents: payment.amount_cents,
                order_total_cents: order.total_cents,
            });
        }
        let mut state = CheckoutState::Pending;

        let authorize = self.gateway.authorize(payment);
        let authorization = match tokio::time::timeout(self.authorize_timeout, authorize).await {
            Err(_) => {
                warn!(
                    %state,
                    amount_cents = payment.amount_cents,
                    "Payment authorization timed out"
                );
                return Err(BookingError::PaymentTimeout {
                    after_secs: self.authorize_timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                warn!(%state, error = %e, "Payment gateway call failed");
                return Err(BookingError::PaymentUnavailable(e.to_string()));
            }
            Ok(Ok(authorization)) => authorization,
        };

        if authorization.status != AuthorizationStatus::Approved {
            state = CheckoutState::PaymentDeclined;
            info!(%state, detail = %authorization.detail, "Payment declined");
            return Err(BookingError::PaymentDeclined {
                detail: authorization.detail,
            });
        }

        state = CheckoutState::PaymentAuthorized;
        let confirmation_id = authorization.confirmation_id;
        info!(
            %state,
            confirmation_id = %confirmation_id,
            user_id = order.user_id,
            "Payment authorized"
        );

        match self
            .orchestrator
            .commit(&order, OrderStatus::Pagado, Some(confirmation_id.clone()))
            .await
        {
            Ok(committed) => {
                state = CheckoutState::OrderCommitted;
                info!(
                    %state,
                    folio = %committed.folio,
                    confirmation_id = %confirmation_id,
                    "Paid order committed"
                );
                Ok(PaidOrder {
                    order: committed,
                    payment_confirmation: confirmation_id,
                })
            }
            Err(e) => {
                state = CheckoutState::OrderFailed;
                error!(
                    %state,
                    confirmation_id = %confirmation_id,
                    user_id = order.user_id,
                    amount_cents = payment.amount_cents,
                    error = %e,
                    "Payment received but order was not persisted; manual reconciliation required"
                );
                Err(BookingError::PostPaymentPersistence {
                    confirmation_id,
                    source: Box::new(e),
                })
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
