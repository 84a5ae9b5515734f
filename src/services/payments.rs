//! Payment ledger: derives amount-paid, balance-due, and the order-level
//! payment status from raw payment and refund rows.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, DbPool};
use crate::entities::delivery_location::ExternalChannel;
use crate::entities::order::{self, OrderStatus};
use crate::entities::payment::{
    self, PaymentMethod, PaymentStatus, PaymentType,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::propagation::{self, RecomputeContext};
use crate::services::{effective_location_name, order_location, MONEY_DP};

/// Order-level payment standing, derived from the payment rows. Exactly one
/// holds for any order at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderPaymentStatus {
    Unpaid,
    PendingPayment,
    PartiallyPaid,
    Paid,
    Overpaid,
    Refunded,
    /// Pre-settled by a third-party delivery partner; payment rows are
    /// irrelevant.
    ExternallySettled(ExternalChannel),
}

impl OrderPaymentStatus {
    /// Whether the order counts as fully paid for fulfilment purposes.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OrderPaymentStatus::Paid
                | OrderPaymentStatus::Overpaid
                | OrderPaymentStatus::ExternallySettled(_)
        )
    }
}

impl fmt::Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderPaymentStatus::Unpaid => write!(f, "UNPAID"),
            OrderPaymentStatus::PendingPayment => write!(f, "PENDING PAYMENT"),
            OrderPaymentStatus::PartiallyPaid => write!(f, "PARTIALLY PAID"),
            OrderPaymentStatus::Paid => write!(f, "PAID"),
            OrderPaymentStatus::Overpaid => write!(f, "OVERPAID"),
            OrderPaymentStatus::Refunded => write!(f, "REFUNDED"),
            OrderPaymentStatus::ExternallySettled(ExternalChannel::Bolt) => {
                write!(f, "PAID ON BOLT")
            }
            OrderPaymentStatus::ExternallySettled(ExternalChannel::Wix) => {
                write!(f, "PAID ON WIX")
            }
        }
    }
}

/// Net amount paid: completed payments minus completed refunds. Rows in any
/// other state contribute nothing.
pub fn net_paid(payments: &[payment::Model]) -> Decimal {
    let mut net = Decimal::ZERO;
    for row in payments {
        if row.status != PaymentStatus::Completed {
            continue;
        }
        match row.payment_type {
            PaymentType::Payment => net += row.amount,
            PaymentType::Refund => net -= row.amount,
        }
    }
    net.round_dp(MONEY_DP)
}

/// Derives the order-level payment status from the order, the effective
/// location name, and its payment rows.
pub fn derive_status(
    order: &order::Model,
    location_name: Option<&str>,
    payments: &[payment::Model],
) -> OrderPaymentStatus {
    if let Some(channel) = location_name.and_then(ExternalChannel::from_location_name) {
        return OrderPaymentStatus::ExternallySettled(channel);
    }

    let mut completed_payments = Decimal::ZERO;
    let mut completed_refunds = Decimal::ZERO;
    let mut has_open_payment = false;
    for row in payments {
        match (row.payment_type, row.status) {
            (PaymentType::Payment, PaymentStatus::Completed) => completed_payments += row.amount,
            (PaymentType::Refund, PaymentStatus::Completed) => completed_refunds += row.amount,
            (PaymentType::Payment, status) if status.is_open() => has_open_payment = true,
            _ => {}
        }
    }

    if order.status == OrderStatus::Cancelled
        && completed_payments > Decimal::ZERO
        && completed_refunds >= completed_payments
    {
        return OrderPaymentStatus::Refunded;
    }

    let net = (completed_payments - completed_refunds).round_dp(MONEY_DP);
    if net < order.total_price {
        if net > Decimal::ZERO {
            OrderPaymentStatus::PartiallyPaid
        } else if has_open_payment {
            OrderPaymentStatus::PendingPayment
        } else {
            OrderPaymentStatus::Unpaid
        }
    } else if net == order.total_price {
        OrderPaymentStatus::Paid
    } else {
        OrderPaymentStatus::Overpaid
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(regex(
        path = "crate::services::PHONE_REGEX",
        message = "Mobile number must be in format +233XXXXXXXXX or 0XXXXXXXXX"
    ))]
    pub mobile_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordRefundRequest {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub reference: Uuid,
    pub mobile_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Ledger projection for one order, computed read-only.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub order_id: Uuid,
    pub total_price: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub amount_overpaid: Decimal,
    pub status: OrderPaymentStatus,
    /// Method of the most recent completed payment, if any.
    pub payment_mode: Option<PaymentMethod>,
}

/// Service recording payments and refunds and deriving ledger projections.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a payment against an order. Counter methods complete
    /// immediately; gateway methods start out pending and are settled later
    /// through `complete_payment`.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    pub async fn record_payment(
        &self,
        request: RecordPaymentRequest,
    ) -> Result<PaymentResponse, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Payment amount must be positive, got {}",
                request.amount
            )));
        }
        if request.method == PaymentMethod::PaystackApi && request.mobile_number.is_none() {
            return Err(ServiceError::ValidationError(
                "Mobile number is required for mobile payments".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db::with_retry("begin payment txn", || db.begin()).await?;

        let order = order::Entity::find_by_id(request.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                warn!(order_id = %request.order_id, "order not found for payment");
                ServiceError::NotFound(format!("Order {} not found", request.order_id))
            })?;

        let now = Utc::now();
        let status = if request.method.is_instant() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };

        let row = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            amount: Set(request.amount.round_dp(MONEY_DP)),
            method: Set(request.method),
            payment_type: Set(PaymentType::Payment),
            status: Set(status),
            reference: Set(Uuid::new_v4()),
            mobile_number: Set(request.mobile_number),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let inserted = row.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "failed to insert payment");
            ServiceError::from_db_err(e, "Duplicate payment reference")
        })?;

        let mut ctx = RecomputeContext::new();
        propagation::recompute_order(&mut ctx, &txn, order.id).await?;

        txn.commit().await?;

        info!(payment_id = %inserted.id, order_id = %order.id, status = %inserted.status, "payment recorded");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentRecorded {
                    order_id: order.id,
                    payment_id: inserted.id,
                })
                .await
            {
                warn!(error = %e, payment_id = %inserted.id, "failed to send payment recorded event");
            }
        }

        Ok(Self::model_to_response(inserted))
    }

    /// Records a refund. The amount must not exceed the current net paid
    /// amount, and refunds are only issued through counter methods.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    pub async fn record_refund(
        &self,
        request: RecordRefundRequest,
    ) -> Result<PaymentResponse, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Refund amount must be positive, got {}",
                request.amount
            )));
        }
        if !request.method.is_refundable() {
            return Err(ServiceError::ValidationError(format!(
                "Refunds cannot be issued through {}",
                request.method
            )));
        }

        let db = &*self.db_pool;
        let txn = db::with_retry("begin refund txn", || db.begin()).await?;

        let order = order::Entity::find_by_id(request.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", request.order_id))
            })?;

        let rows = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        let paid = net_paid(&rows);
        if request.amount > paid {
            return Err(ServiceError::ValidationError(format!(
                "Refund amount ({}) cannot exceed the net amount paid ({})",
                request.amount, paid
            )));
        }

        let now = Utc::now();
        let row = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            amount: Set(request.amount.round_dp(MONEY_DP)),
            method: Set(request.method),
            payment_type: Set(PaymentType::Refund),
            status: Set(PaymentStatus::Completed),
            reference: Set(Uuid::new_v4()),
            mobile_number: Set(None),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let inserted = row.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "failed to insert refund");
            ServiceError::from_db_err(e, "Duplicate payment reference")
        })?;

        let mut ctx = RecomputeContext::new();
        propagation::recompute_order(&mut ctx, &txn, order.id).await?;

        txn.commit().await?;

        info!(payment_id = %inserted.id, order_id = %order.id, "refund recorded");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentRefunded {
                    order_id: order.id,
                    payment_id: inserted.id,
                })
                .await
            {
                warn!(error = %e, payment_id = %inserted.id, "failed to send refund event");
            }
        }

        Ok(Self::model_to_response(inserted))
    }

    /// Marks a pending or processing payment as completed.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn complete_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let updated = self
            .settle_payment(payment_id, PaymentStatus::Completed)
            .await?;
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::PaymentCompleted(payment_id)).await {
                warn!(error = %e, payment_id = %payment_id, "failed to send payment completed event");
            }
        }
        Ok(updated)
    }

    /// Marks a pending or processing payment as failed.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn fail_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let updated = self.settle_payment(payment_id, PaymentStatus::Failed).await?;
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::PaymentFailed(payment_id)).await {
                warn!(error = %e, payment_id = %payment_id, "failed to send payment failed event");
            }
        }
        Ok(updated)
    }

    async fn settle_payment(
        &self,
        payment_id: Uuid,
        target: PaymentStatus,
    ) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin payment settle txn", || db.begin()).await?;

        let row = payment::Entity::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;

        if !row.status.is_open() {
            return Err(ServiceError::InvariantViolation(format!(
                "Payment {} is already {}, cannot move to {}",
                payment_id, row.status, target
            )));
        }

        let order_id = row.order_id;
        let mut active: payment::ActiveModel = row.into();
        active.status = Set(target);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        let mut ctx = RecomputeContext::new();
        propagation::recompute_order(&mut ctx, &txn, order_id).await?;

        txn.commit().await?;

        info!(payment_id = %payment_id, status = %target, "payment settled");
        Ok(Self::model_to_response(updated))
    }

    /// Read-only: the derived payment status for an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn payment_status(&self, order_id: Uuid) -> Result<OrderPaymentStatus, ServiceError> {
        let summary = self.payment_summary(order_id).await?;
        Ok(summary.status)
    }

    /// Read-only: full ledger projection for an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn payment_summary(&self, order_id: Uuid) -> Result<PaymentSummary, ServiceError> {
        let db = &*self.db_pool;

        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let rows = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_desc(payment::Column::CreatedAt)
            .all(db)
            .await?;

        let location = order_location(db, &order).await?;
        let location_name = effective_location_name(&order, location.as_ref());
        let status = derive_status(&order, location_name.as_deref(), &rows);

        let paid = net_paid(&rows);
        let balance_due = (order.total_price - paid).max(Decimal::ZERO);
        let amount_overpaid = (paid - order.total_price).max(Decimal::ZERO);

        let payment_mode = rows
            .iter()
            .find(|row| {
                row.payment_type == PaymentType::Payment && row.status == PaymentStatus::Completed
            })
            .map(|row| row.method);

        Ok(PaymentSummary {
            order_id,
            total_price: order.total_price,
            amount_paid: paid,
            balance_due,
            amount_overpaid,
            status,
            payment_mode,
        })
    }

    /// Read-only: whether the order is settled enough to fulfil. Used by the
    /// order state machine inside its own transaction.
    pub(crate) async fn derive_status_in<C: sea_orm::ConnectionTrait>(
        conn: &C,
        order: &order::Model,
    ) -> Result<OrderPaymentStatus, ServiceError> {
        let rows = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .all(conn)
            .await?;
        let location = order_location(conn, order).await?;
        let location_name = effective_location_name(order, location.as_ref());
        Ok(derive_status(order, location_name.as_deref(), &rows))
    }

    fn model_to_response(model: payment::Model) -> PaymentResponse {
        PaymentResponse {
            id: model.id,
            order_id: model.order_id,
            amount: model.amount,
            method: model.method,
            payment_type: model.payment_type,
            status: model.status,
            reference: model.reference,
            mobile_number: model.mobile_number,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
