//! Delivery assignment manager: binds orders to capacity-constrained riders
//! and tracks each assignment through its own lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, DbPool};
use crate::entities::delivery_rider::{self, RiderStatus};
use crate::entities::order::{self, DeliveryType, OrderStatus};
use crate::entities::order_assignment::{self, AssignmentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{external_channel, order_location};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateRiderRequest {
    #[validate(length(min = 1, message = "Rider name is required"))]
    pub name: String,
    #[validate(regex(
        path = "crate::services::PHONE_REGEX",
        message = "Phone number must be in format +233XXXXXXXXX or 0XXXXXXXXX"
    ))]
    pub phone: String,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub max_concurrent_orders: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
    pub delivery_instructions: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAssignmentStatusRequest {
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RiderResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: RiderStatus,
    pub current_orders: i32,
    pub total_deliveries: i32,
    pub today_deliveries: i32,
    pub max_concurrent_orders: i32,
    pub is_available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub status: AssignmentStatus,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_instructions: Option<String>,
    pub delivery_notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

/// Service managing riders and order assignments.
#[derive(Clone)]
pub struct DeliveryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl DeliveryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Registers a new rider, available and active by default.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_rider(
        &self,
        request: CreateRiderRequest,
    ) -> Result<RiderResponse, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let active = delivery_rider::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            phone: Set(request.phone),
            status: Set(RiderStatus::Active),
            current_orders: Set(0),
            total_deliveries: Set(0),
            today_deliveries: Set(0),
            max_concurrent_orders: Set(request.max_concurrent_orders),
            is_available: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let rider = active.insert(&*self.db_pool).await?;
        info!(rider_id = %rider.id, "rider registered");
        Ok(rider_to_response(rider))
    }

    /// Updates a rider's availability flags.
    #[instrument(skip(self), fields(rider_id = %rider_id))]
    pub async fn set_rider_availability(
        &self,
        rider_id: Uuid,
        is_available: bool,
        status: Option<RiderStatus>,
    ) -> Result<RiderResponse, ServiceError> {
        let db = &*self.db_pool;
        let rider = delivery_rider::Entity::find_by_id(rider_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Rider {} not found", rider_id)))?;

        let mut active: delivery_rider::ActiveModel = rider.into();
        active.is_available = Set(is_available);
        if let Some(status) = status {
            active.status = Set(status);
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;
        Ok(rider_to_response(updated))
    }

    /// Riders currently able to take another order: active, available, and
    /// below their concurrent capacity.
    #[instrument(skip(self))]
    pub async fn available_riders(&self) -> Result<Vec<RiderResponse>, ServiceError> {
        let riders = delivery_rider::Entity::find()
            .filter(delivery_rider::Column::Status.eq(RiderStatus::Active))
            .filter(delivery_rider::Column::IsAvailable.eq(true))
            .filter(
                Expr::col(delivery_rider::Column::CurrentOrders)
                    .lt(Expr::col(delivery_rider::Column::MaxConcurrentOrders)),
            )
            .order_by_asc(delivery_rider::Column::CurrentOrders)
            .all(&*self.db_pool)
            .await?;
        Ok(riders.into_iter().map(rider_to_response).collect())
    }

    /// Assigns a rider to an order. All preconditions are checked inside one
    /// transaction; a lost race yields `Conflict`, never a second
    /// assignment.
    #[instrument(skip(self, request), fields(order_id = %order_id, rider_id = %request.rider_id))]
    pub async fn assign_rider(
        &self,
        order_id: Uuid,
        request: AssignRiderRequest,
    ) -> Result<AssignmentResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let txn = db::with_retry("begin assignment txn", || db.begin()).await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.delivery_type != DeliveryType::Delivery {
            return Err(ServiceError::InvariantViolation(format!(
                "Order {} is not a delivery order",
                order.order_number
            )));
        }
        if !matches!(
            order.status,
            OrderStatus::Accepted | OrderStatus::Ready | OrderStatus::OutForDelivery
        ) {
            return Err(ServiceError::InvariantViolation(format!(
                "Order {} is not ready for assignment (status: {})",
                order.order_number, order.status
            )));
        }

        let location = order_location(&txn, &order).await?;
        if let Some(channel) = external_channel(&order, location.as_ref()) {
            return Err(ServiceError::InvariantViolation(format!(
                "Order {} is fulfilled by {}; riders cannot be assigned",
                order.order_number,
                channel.location_name()
            )));
        }

        let existing = order_assignment::Entity::find()
            .filter(order_assignment::Column::OrderId.eq(order_id))
            .one(&txn)
            .await?;
        if let Some(existing) = &existing {
            if existing.status != AssignmentStatus::Cancelled {
                warn!(order_id = %order_id, "order already assigned");
                return Err(ServiceError::Conflict(format!(
                    "Order {} is already assigned to a rider",
                    order.order_number
                )));
            }
        }

        let rider = delivery_rider::Entity::find_by_id(request.rider_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Rider {} not found", request.rider_id))
            })?;
        if rider.status != RiderStatus::Active || !rider.is_available {
            return Err(ServiceError::InvariantViolation(format!(
                "Rider {} is not available",
                rider.name
            )));
        }
        if rider.current_orders >= rider.max_concurrent_orders {
            return Err(ServiceError::InvariantViolation(format!(
                "Rider {} is at capacity ({}/{})",
                rider.name, rider.current_orders, rider.max_concurrent_orders
            )));
        }

        // Close the check-then-act window: a racing transaction may have
        // claimed the order since the first read. The unique constraint on
        // order_id is the storage-level backstop.
        let race = order_assignment::Entity::find()
            .filter(order_assignment::Column::OrderId.eq(order_id))
            .filter(order_assignment::Column::Status.ne(AssignmentStatus::Cancelled))
            .count(&txn)
            .await?;
        if race > 0 {
            return Err(ServiceError::Conflict(format!(
                "Order {} was assigned concurrently",
                order.order_number
            )));
        }

        let now = Utc::now();
        let assignment = match existing {
            // A cancelled assignment is revived in place; the unique
            // constraint allows only one row per order.
            Some(cancelled) => {
                let mut active: order_assignment::ActiveModel = cancelled.into();
                active.rider_id = Set(Some(rider.id));
                active.status = Set(AssignmentStatus::Assigned);
                active.picked_up_at = Set(None);
                active.delivered_at = Set(None);
                active.delivery_instructions = Set(request.delivery_instructions);
                active.cancellation_reason = Set(None);
                active.updated_at = Set(Some(now));
                active.update(&txn).await?
            }
            None => {
                let active = order_assignment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id),
                    rider_id: Set(Some(rider.id)),
                    status: Set(AssignmentStatus::Assigned),
                    picked_up_at: Set(None),
                    delivered_at: Set(None),
                    delivery_instructions: Set(request.delivery_instructions),
                    delivery_notes: Set(None),
                    cancellation_reason: Set(None),
                    created_at: Set(now),
                    updated_at: Set(Some(now)),
                };
                active.insert(&txn).await.map_err(|e| {
                    error!(error = %e, order_id = %order_id, "failed to insert assignment");
                    ServiceError::from_db_err(e, "Order was assigned concurrently")
                })?
            }
        };

        // Creation takes the capacity slot immediately; terminal transitions
        // recount from rows.
        let mut rider_active: delivery_rider::ActiveModel = rider.clone().into();
        rider_active.current_orders = Set(rider.current_orders + 1);
        rider_active.updated_at = Set(Some(now));
        rider_active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, rider_id = %rider.id, "rider assigned");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::AssignmentCreated {
                    order_id,
                    rider_id: rider.id,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "failed to send assignment created event");
            }
        }

        Ok(assignment_to_response(assignment))
    }

    /// Moves an assignment along its lifecycle. Terminal transitions recount
    /// rider statistics from assignment rows; reaching Delivered marks the
    /// parent order Fulfilled exactly once.
    #[instrument(skip(self, request), fields(assignment_id = %assignment_id, new_status = %request.status))]
    pub async fn update_assignment_status(
        &self,
        assignment_id: Uuid,
        request: UpdateAssignmentStatusRequest,
    ) -> Result<AssignmentResponse, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin assignment status txn", || db.begin()).await?;

        let assignment = order_assignment::Entity::find_by_id(assignment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Assignment {} not found", assignment_id))
            })?;

        let old_status = assignment.status;
        let new_status = request.status;

        if !is_valid_transition(old_status, new_status) {
            return Err(ServiceError::InvariantViolation(format!(
                "Invalid assignment transition from {} to {}",
                old_status, new_status
            )));
        }

        let now = Utc::now();
        let order_id = assignment.order_id;
        let rider_id = assignment.rider_id;

        let mut active: order_assignment::ActiveModel = assignment.clone().into();
        active.status = Set(new_status);
        if let Some(notes) = request.notes {
            active.delivery_notes = Set(Some(notes));
        }

        let mut order_fulfilled = false;
        match new_status {
            AssignmentStatus::PickedUp => {
                if assignment.picked_up_at.is_none() {
                    active.picked_up_at = Set(Some(now));
                }
                move_order_out_for_delivery(&txn, order_id, now).await?;
            }
            AssignmentStatus::Delivered => {
                if assignment.delivered_at.is_none() {
                    active.delivered_at = Set(Some(now));
                }
                // Cascade guard: the order is fulfilled at most once even if
                // the delivered transition fires again.
                order_fulfilled = fulfil_order_once(&txn, order_id, now).await?;
            }
            AssignmentStatus::Cancelled => {
                if let Some(reason) = request.cancellation_reason {
                    active.cancellation_reason = Set(Some(reason));
                }
            }
            _ => {}
        }

        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        if new_status.is_terminal() {
            if let Some(rider_id) = rider_id {
                recalculate_rider_stats(&txn, rider_id).await?;
            }
        }

        txn.commit().await?;

        info!(
            assignment_id = %assignment_id,
            old_status = %old_status,
            new_status = %new_status,
            "assignment status updated"
        );

        if let Some(event_sender) = &self.event_sender {
            if old_status != new_status {
                if let Err(e) = event_sender
                    .send(Event::AssignmentStatusChanged {
                        assignment_id,
                        old_status,
                        new_status,
                    })
                    .await
                {
                    warn!(error = %e, assignment_id = %assignment_id, "failed to send assignment event");
                }
            }
            if order_fulfilled {
                if let Err(e) = event_sender.send(Event::OrderFulfilled(order_id)).await {
                    warn!(error = %e, order_id = %order_id, "failed to send order fulfilled event");
                }
            }
        }

        Ok(assignment_to_response(updated))
    }

    /// Read-only: the assignment bound to an order, if any.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_assignment(
        &self,
        order_id: Uuid,
    ) -> Result<Option<AssignmentResponse>, ServiceError> {
        let assignment = order_assignment::Entity::find()
            .filter(order_assignment::Column::OrderId.eq(order_id))
            .one(&*self.db_pool)
            .await?;
        Ok(assignment.map(assignment_to_response))
    }

    /// Read-only: a rider's assignments that still hold a capacity slot.
    #[instrument(skip(self), fields(rider_id = %rider_id))]
    pub async fn rider_active_assignments(
        &self,
        rider_id: Uuid,
    ) -> Result<Vec<AssignmentResponse>, ServiceError> {
        let assignments = order_assignment::Entity::find()
            .filter(order_assignment::Column::RiderId.eq(rider_id))
            .filter(order_assignment::Column::Status.is_in([
                AssignmentStatus::Assigned,
                AssignmentStatus::Accepted,
                AssignmentStatus::PickedUp,
                AssignmentStatus::InTransit,
            ]))
            .all(&*self.db_pool)
            .await?;
        Ok(assignments.into_iter().map(assignment_to_response).collect())
    }

    /// Read-only: a rider's current statistics.
    #[instrument(skip(self), fields(rider_id = %rider_id))]
    pub async fn get_rider(&self, rider_id: Uuid) -> Result<RiderResponse, ServiceError> {
        let rider = delivery_rider::Entity::find_by_id(rider_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Rider {} not found", rider_id)))?;
        Ok(rider_to_response(rider))
    }

    /// Recounts a rider's statistics from assignment rows. Idempotent;
    /// useful for healing drift after partial failures.
    #[instrument(skip(self), fields(rider_id = %rider_id))]
    pub async fn reconcile_rider_stats(&self, rider_id: Uuid) -> Result<RiderResponse, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin rider reconcile txn", || db.begin()).await?;
        recalculate_rider_stats(&txn, rider_id).await?;
        let rider = delivery_rider::Entity::find_by_id(rider_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Rider {} not found", rider_id)))?;
        txn.commit().await?;
        Ok(rider_to_response(rider))
    }
}

/// Allowed assignment transitions. Re-asserting the current status is a
/// no-op so duplicate terminal events stay harmless.
fn is_valid_transition(from: AssignmentStatus, to: AssignmentStatus) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (AssignmentStatus::Assigned, AssignmentStatus::Accepted) => true,
        (AssignmentStatus::Accepted, AssignmentStatus::PickedUp) => true,
        (AssignmentStatus::PickedUp, AssignmentStatus::InTransit) => true,
        (AssignmentStatus::InTransit, AssignmentStatus::Delivered) => true,
        (AssignmentStatus::InTransit, AssignmentStatus::Returned) => true,
        (from, AssignmentStatus::Cancelled) => !from.is_terminal(),
        _ => false,
    }
}

/// Moves a delivery order to Out for Delivery when a rider picks it up.
async fn move_order_out_for_delivery<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    if order.delivery_type == DeliveryType::Delivery
        && order.status != OrderStatus::OutForDelivery
        && !order.status.is_terminal()
    {
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::OutForDelivery);
        active.updated_at = Set(Some(now));
        active.update(conn).await?;
    }
    Ok(())
}

/// Marks the parent order Fulfilled if it is not already. Returns whether a
/// change was made, so the cascade fires at most once.
async fn fulfil_order_once<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    if order.status == OrderStatus::Fulfilled {
        return Ok(false);
    }
    let order_number = order.order_number.clone();
    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Fulfilled);
    active.updated_at = Set(Some(now));
    active.update(conn).await?;
    info!(order_number = %order_number, "order marked fulfilled by delivery");
    Ok(true)
}

/// Rebuilds a rider's statistics from assignment rows: active assignments
/// hold capacity, delivered and returned rows count as deliveries.
async fn recalculate_rider_stats<C: sea_orm::ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
) -> Result<(), ServiceError> {
    let current = order_assignment::Entity::find()
        .filter(order_assignment::Column::RiderId.eq(rider_id))
        .filter(order_assignment::Column::Status.is_in([
            AssignmentStatus::Assigned,
            AssignmentStatus::Accepted,
            AssignmentStatus::PickedUp,
            AssignmentStatus::InTransit,
        ]))
        .count(conn)
        .await?;

    let completed = order_assignment::Entity::find()
        .filter(order_assignment::Column::RiderId.eq(rider_id))
        .filter(order_assignment::Column::Status.is_in([
            AssignmentStatus::Delivered,
            AssignmentStatus::Returned,
        ]))
        .count(conn)
        .await?;

    let today_start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    let today = order_assignment::Entity::find()
        .filter(order_assignment::Column::RiderId.eq(rider_id))
        .filter(order_assignment::Column::Status.is_in([
            AssignmentStatus::Delivered,
            AssignmentStatus::Returned,
        ]))
        .filter(order_assignment::Column::UpdatedAt.gte(today_start))
        .count(conn)
        .await?;

    let update = delivery_rider::ActiveModel {
        id: Set(rider_id),
        current_orders: Set(current as i32),
        total_deliveries: Set(completed as i32),
        today_deliveries: Set(today as i32),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    update.update(conn).await?;

    info!(
        rider_id = %rider_id,
        current_orders = current,
        total_deliveries = completed,
        today_deliveries = today,
        "rider statistics recalculated"
    );
    Ok(())
}

fn rider_to_response(model: delivery_rider::Model) -> RiderResponse {
    RiderResponse {
        id: model.id,
        name: model.name,
        phone: model.phone,
        status: model.status,
        current_orders: model.current_orders,
        total_deliveries: model.total_deliveries,
        today_deliveries: model.today_deliveries,
        max_concurrent_orders: model.max_concurrent_orders,
        is_available: model.is_available,
    }
}

fn assignment_to_response(model: order_assignment::Model) -> AssignmentResponse {
    AssignmentResponse {
        id: model.id,
        order_id: model.order_id,
        rider_id: model.rider_id,
        status: model.status,
        picked_up_at: model.picked_up_at,
        delivered_at: model.delivered_at,
        delivery_instructions: model.delivery_instructions,
        delivery_notes: model.delivery_notes,
        cancellation_reason: model.cancellation_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(is_valid_transition(
            AssignmentStatus::Assigned,
            AssignmentStatus::Accepted
        ));
        assert!(is_valid_transition(
            AssignmentStatus::Accepted,
            AssignmentStatus::PickedUp
        ));
        assert!(is_valid_transition(
            AssignmentStatus::PickedUp,
            AssignmentStatus::InTransit
        ));
        assert!(is_valid_transition(
            AssignmentStatus::InTransit,
            AssignmentStatus::Delivered
        ));
        assert!(is_valid_transition(
            AssignmentStatus::InTransit,
            AssignmentStatus::Returned
        ));
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert!(!is_valid_transition(
            AssignmentStatus::Assigned,
            AssignmentStatus::Delivered
        ));
        assert!(!is_valid_transition(
            AssignmentStatus::Accepted,
            AssignmentStatus::InTransit
        ));
    }

    #[test]
    fn cancel_only_from_non_terminal() {
        assert!(is_valid_transition(
            AssignmentStatus::Assigned,
            AssignmentStatus::Cancelled
        ));
        assert!(is_valid_transition(
            AssignmentStatus::InTransit,
            AssignmentStatus::Cancelled
        ));
        assert!(!is_valid_transition(
            AssignmentStatus::Delivered,
            AssignmentStatus::Cancelled
        ));
        assert!(!is_valid_transition(
            AssignmentStatus::Returned,
            AssignmentStatus::Cancelled
        ));
    }

    #[test]
    fn reasserting_the_same_status_is_a_no_op() {
        assert!(is_valid_transition(
            AssignmentStatus::Delivered,
            AssignmentStatus::Delivered
        ));
    }

    #[test]
    fn terminal_states_do_not_move_forward() {
        assert!(!is_valid_transition(
            AssignmentStatus::Delivered,
            AssignmentStatus::Returned
        ));
        assert!(!is_valid_transition(
            AssignmentStatus::Cancelled,
            AssignmentStatus::Assigned
        ));
    }
}
