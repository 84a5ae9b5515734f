//! Order lifecycle: creation, item changes, delivery disposition, and the
//! guarded status state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, DbPool};
use crate::entities::order::{self, DeliveryType, OrderStatus};
use crate::entities::order_item::{self, ItemType};
use crate::entities::{delivery_location, payment};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::propagation::{self, RecomputeContext};
use crate::services::payments::{net_paid, OrderPaymentStatus, PaymentService};
use crate::services::pricing::{self, LocationSnapshot, MenuItemSnapshot};
use crate::services::{effective_location_name, order_location, time_ago};

/// Bounded attempts to find a free order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// One order line in a creation or replacement payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub item: MenuItemSnapshot,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub delivery_type: DeliveryType,
    pub delivery_location_id: Option<Uuid>,
    pub custom_delivery_location: Option<String>,
    pub custom_delivery_fee: Option<Decimal>,
    #[validate(regex(
        path = "crate::services::PHONE_REGEX",
        message = "Phone number must be in format +233XXXXXXXXX or 0XXXXXXXXX"
    ))]
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

/// Partial update. `None` leaves a field unchanged; the `clear_*` flags
/// explicitly drop a location reference or custom location.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    pub delivery_type: Option<DeliveryType>,
    pub delivery_location_id: Option<Uuid>,
    #[serde(default)]
    pub clear_delivery_location: bool,
    pub custom_delivery_location: Option<String>,
    pub custom_delivery_fee: Option<Decimal>,
    #[serde(default)]
    pub clear_custom_location: bool,
    #[validate(regex(
        path = "crate::services::PHONE_REGEX",
        message = "Phone number must be in format +233XXXXXXXXX or 0XXXXXXXXX"
    ))]
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    /// Replace-all semantics: when present, existing items are dropped and
    /// these take their place.
    pub items: Option<Vec<OrderItemInput>>,
}

/// A single explicit item mutation.
#[derive(Debug, Serialize, Deserialize)]
pub enum ItemChange {
    Add { item: MenuItemSnapshot, quantity: i32 },
    UpdateQuantity { item_id: Uuid, quantity: i32 },
    Remove { item_id: Uuid },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub delivery_type: DeliveryType,
    pub total_price: Decimal,
    pub delivery_fee: Decimal,
    pub delivery_location_id: Option<Uuid>,
    pub delivery_location_name: Option<String>,
    pub delivery_location_fee: Option<Decimal>,
    pub custom_delivery_location: Option<String>,
    pub custom_delivery_fee: Option<Decimal>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub menu_item_id: Option<Uuid>,
    pub item_name: String,
    pub item_type: ItemType,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Full read projection: the order, its lines, and the payment ledger.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub amount_overpaid: Decimal,
    pub payment_status: OrderPaymentStatus,
    pub effective_delivery_location: Option<String>,
    pub time_ago: String,
}

/// Service owning order creation, mutation, and status transitions.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new order with its items, captures location snapshots, and
    /// computes totals. Delivery orders start at Accepted, pickup orders at
    /// Pending.
    #[instrument(skip(self, request), fields(delivery_type = %request.delivery_type))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "An order needs at least one item".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db::with_retry("begin order txn", || db.begin()).await?;

        let location = match request.delivery_location_id {
            Some(location_id) => {
                let location = delivery_location::Entity::find_by_id(location_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "Delivery location {} does not exist",
                            location_id
                        ))
                    })?;
                if !location.is_active {
                    return Err(ServiceError::ValidationError(format!(
                        "Delivery location '{}' is not active",
                        location.name
                    )));
                }
                Some(location)
            }
            None => None,
        };

        validate_location_fields(
            request.delivery_type,
            request.delivery_location_id.is_some(),
            request.custom_delivery_location.is_some() || request.custom_delivery_fee.is_some(),
            request.customer_phone.as_deref(),
            location.as_ref().map(|l| l.name.as_str()),
        )?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = next_order_number(&txn, now).await?;

        let status = match request.delivery_type {
            DeliveryType::Delivery => OrderStatus::Accepted,
            DeliveryType::Pickup => OrderStatus::Pending,
        };

        // Snapshot catalog location data at save time; custom locations are
        // kept in their own columns and reconciled on demand.
        let snapshot = location.as_ref().map(LocationSnapshot::from_location);

        let order_active = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            status: Set(status),
            delivery_type: Set(request.delivery_type),
            total_price: Set(Decimal::ZERO),
            delivery_fee: Set(Decimal::ZERO),
            delivery_location_id: Set(request.delivery_location_id),
            delivery_location_name: Set(snapshot.as_ref().map(|s| s.name.clone())),
            delivery_location_fee: Set(snapshot.as_ref().map(|s| s.fee)),
            custom_delivery_location: Set(request.custom_delivery_location),
            custom_delivery_fee: Set(request.custom_delivery_fee),
            customer_phone: Set(request.customer_phone),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        order_active.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_number = %order_number, "failed to insert order");
            ServiceError::from_db_err(e, "Order number already taken")
        })?;

        for input in &request.items {
            insert_item(&txn, order_id, &input.item, input.quantity).await?;
        }

        let mut ctx = RecomputeContext::new();
        propagation::recompute_order(&mut ctx, &txn, order_id).await?;

        let details = load_details(&txn, order_id).await?;
        txn.commit().await?;

        info!(order_id = %order_id, order_number = %order_number, "order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "failed to send order created event");
            }
        }

        Ok(details)
    }

    /// Retrieves an order with its items and ledger projections.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        load_details(&*self.db_pool, order_id).await
    }

    /// Updates an order's delivery disposition, location, phone, notes, or
    /// items, preserving location history and recomputing totals.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let txn = db::with_retry("begin order update txn", || db.begin()).await?;

        let current = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let new_location_id = if request.clear_delivery_location {
            None
        } else {
            request.delivery_location_id.or(current.delivery_location_id)
        };

        let mut active: order::ActiveModel = current.clone().into();

        // Preserve the outgoing location's data before the reference moves.
        if new_location_id != current.delivery_location_id {
            if current.delivery_location_name.is_none() {
                if let Some(outgoing) = order_location(&txn, &current).await? {
                    let snapshot = LocationSnapshot::from_location(&outgoing);
                    active.delivery_location_name = Set(Some(snapshot.name));
                    active.delivery_location_fee = Set(Some(snapshot.fee));
                }
            }
        }

        let new_location = match new_location_id {
            Some(location_id) => {
                let location = delivery_location::Entity::find_by_id(location_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "Delivery location {} does not exist",
                            location_id
                        ))
                    })?;
                if !location.is_active && new_location_id != current.delivery_location_id {
                    return Err(ServiceError::ValidationError(format!(
                        "Delivery location '{}' is not active",
                        location.name
                    )));
                }
                Some(location)
            }
            None => None,
        };

        // A changed reference starts a new snapshot era, captured at save.
        if new_location_id != current.delivery_location_id {
            if let Some(location) = new_location.as_ref() {
                let snapshot = LocationSnapshot::from_location(location);
                active.delivery_location_name = Set(Some(snapshot.name));
                active.delivery_location_fee = Set(Some(snapshot.fee));
            }
        }

        active.delivery_location_id = Set(new_location_id);

        let new_custom_location = if request.clear_custom_location {
            None
        } else {
            request
                .custom_delivery_location
                .clone()
                .or(current.custom_delivery_location.clone())
        };
        let new_custom_fee = if request.clear_custom_location {
            None
        } else {
            request.custom_delivery_fee.or(current.custom_delivery_fee)
        };
        active.custom_delivery_location = Set(new_custom_location.clone());
        active.custom_delivery_fee = Set(new_custom_fee);

        let new_delivery_type = request.delivery_type.unwrap_or(current.delivery_type);
        active.delivery_type = Set(new_delivery_type);

        let new_phone = request.customer_phone.clone().or(current.customer_phone.clone());
        active.customer_phone = Set(new_phone.clone());

        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }

        validate_location_fields(
            new_delivery_type,
            new_location_id.is_some(),
            new_custom_location.is_some() || new_custom_fee.is_some(),
            new_phone.as_deref(),
            new_location.as_ref().map(|l| l.name.as_str()),
        )?;

        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        if let Some(items) = request.items {
            order_item::Entity::delete_many()
                .filter(order_item::Column::OrderId.eq(order_id))
                .exec(&txn)
                .await?;
            for input in &items {
                insert_item(&txn, order_id, &input.item, input.quantity).await?;
            }
        }

        let mut ctx = RecomputeContext::new();
        propagation::recompute_order(&mut ctx, &txn, order_id).await?;

        let details = load_details(&txn, order_id).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderUpdated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "failed to send order updated event");
            }
        }

        Ok(details)
    }

    /// Applies one explicit item mutation and recomputes the order total.
    #[instrument(skip(self, change), fields(order_id = %order_id))]
    pub async fn apply_item_change(
        &self,
        order_id: Uuid,
        change: ItemChange,
    ) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin item change txn", || db.begin()).await?;

        order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        match change {
            ItemChange::Add { item, quantity } => {
                insert_item(&txn, order_id, &item, quantity).await?;
            }
            ItemChange::UpdateQuantity { item_id, quantity } => {
                let existing = find_owned_item(&txn, order_id, item_id).await?;
                let subtotal = pricing::line_subtotal(quantity, existing.unit_price)?;
                let mut active: order_item::ActiveModel = existing.into();
                active.quantity = Set(quantity);
                active.subtotal = Set(subtotal);
                active.updated_at = Set(Some(Utc::now()));
                active.update(&txn).await?;
            }
            ItemChange::Remove { item_id } => {
                let existing = find_owned_item(&txn, order_id, item_id).await?;
                let active: order_item::ActiveModel = existing.into();
                active.delete(&txn).await?;
            }
        }

        let mut ctx = RecomputeContext::new();
        propagation::recompute_order(&mut ctx, &txn, order_id).await?;

        let details = load_details(&txn, order_id).await?;
        txn.commit().await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderUpdated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "failed to send order updated event");
            }
        }

        Ok(details)
    }

    /// Moves an order to a new status, enforcing the delivery-disposition and
    /// payment guards. Re-asserting the current status is a no-op.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin status txn", || db.begin()).await?;

        let current = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = current.status.clone();
        if old_status == new_status {
            return Ok(model_to_response(current));
        }

        if new_status == OrderStatus::OutForDelivery
            && current.delivery_type != DeliveryType::Delivery
        {
            return Err(ServiceError::InvariantViolation(
                "Out for Delivery status is only available for delivery orders".to_string(),
            ));
        }

        if new_status == OrderStatus::Fulfilled {
            let payment_status = PaymentService::derive_status_in(&txn, &current).await?;
            if !payment_status.is_settled() {
                return Err(ServiceError::InvariantViolation(format!(
                    "Fulfilled status requires full payment; current payment status: {}",
                    payment_status
                )));
            }
        }

        let mut active: order::ActiveModel = current.into();
        active.status = Set(new_status.clone());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %new_status, "order status updated");

        if let Some(event_sender) = &self.event_sender {
            let _ = event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: new_status.clone(),
                })
                .await;
            let follow_up = match new_status {
                OrderStatus::Fulfilled => Some(Event::OrderFulfilled(order_id)),
                OrderStatus::Cancelled => Some(Event::OrderCancelled(order_id)),
                _ => None,
            };
            if let Some(event) = follow_up {
                if let Err(e) = event_sender.send(event).await {
                    warn!(error = %e, order_id = %order_id, "failed to send status event");
                }
            }
        }

        Ok(model_to_response(updated))
    }

    /// Cancels an order, optionally recording the reason in its notes.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let mut response = self.update_status(order_id, OrderStatus::Cancelled).await?;
        if let Some(reason) = reason {
            let update = order::ActiveModel {
                id: Set(order_id),
                notes: Set(Some(reason.clone())),
                ..Default::default()
            };
            update.update(&*self.db_pool).await?;
            response.notes = Some(reason);
        }
        Ok(response)
    }

    /// Recomputes an order's totals. Idempotent: with no item changes, the
    /// total is unchanged.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn recompute_totals(&self, order_id: Uuid) -> Result<Decimal, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin recompute txn", || db.begin()).await?;
        let mut ctx = RecomputeContext::new();
        let total = propagation::recompute_order(&mut ctx, &txn, order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("recompute was suppressed unexpectedly".to_string())
            })?;
        txn.commit().await?;
        Ok(total)
    }

    /// Clears the menu reference from every order item that points at the
    /// given menu record. The denormalized name, type, and price stay, so
    /// order history remains priceable. Returns the number of detached rows.
    #[instrument(skip(self), fields(menu_item_id = %menu_item_id))]
    pub async fn detach_menu_item(&self, menu_item_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let result = order_item::Entity::update_many()
            .col_expr(
                order_item::Column::MenuItemId,
                Expr::value(sea_orm::Value::Uuid(None)),
            )
            .filter(order_item::Column::MenuItemId.eq(menu_item_id))
            .exec(db)
            .await?;
        info!(menu_item_id = %menu_item_id, detached = result.rows_affected, "menu item detached from order history");
        Ok(result.rows_affected)
    }
}

/// Field requirements for the chosen delivery disposition. Partner-channel
/// orders are exempt from the phone requirement.
fn validate_location_fields(
    delivery_type: DeliveryType,
    has_location: bool,
    has_custom: bool,
    phone: Option<&str>,
    location_name: Option<&str>,
) -> Result<(), ServiceError> {
    if has_location && has_custom {
        return Err(ServiceError::ValidationError(
            "An order cannot have both a delivery location and a custom location".to_string(),
        ));
    }
    if delivery_type == DeliveryType::Delivery {
        if !has_location && !has_custom {
            return Err(ServiceError::ValidationError(
                "Delivery location is required for delivery orders".to_string(),
            ));
        }
        let is_partner = location_name
            .and_then(crate::entities::ExternalChannel::from_location_name)
            .is_some();
        if !is_partner && phone.map_or(true, |p| p.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "Customer phone number is required for delivery orders".to_string(),
            ));
        }
    }
    Ok(())
}

/// Generates the next `DDMMYY-NNN` order number: daily sequence, bounded
/// probing past numbers already taken.
async fn next_order_number<C: sea_orm::ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let date_prefix = now.format("%d%m%y").to_string();
    let today = order::Entity::find()
        .filter(order::Column::OrderNumber.starts_with(format!("{}-", date_prefix)))
        .count(conn)
        .await?;

    let mut sequence = today + 1;
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = format_order_number(&date_prefix, sequence);
        let taken = order::Entity::find()
            .filter(order::Column::OrderNumber.eq(candidate.clone()))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        sequence += 1;
    }

    Err(ServiceError::Conflict(format!(
        "Could not allocate an order number for {}",
        date_prefix
    )))
}

fn format_order_number(date_prefix: &str, sequence: u64) -> String {
    format!("{}-{:03}", date_prefix, sequence)
}

async fn insert_item<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    item: &MenuItemSnapshot,
    quantity: i32,
) -> Result<order_item::Model, ServiceError> {
    let snapshot = MenuItemSnapshot::new(
        item.menu_item_id,
        item.name.clone(),
        item.item_type,
        item.unit_price,
    )?;
    let subtotal = pricing::line_subtotal(quantity, snapshot.unit_price)?;

    let active = order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        menu_item_id: Set(snapshot.menu_item_id),
        item_name: Set(snapshot.name),
        item_type: Set(snapshot.item_type),
        quantity: Set(quantity),
        unit_price: Set(snapshot.unit_price),
        subtotal: Set(subtotal),
        ..Default::default()
    };
    Ok(active.insert(conn).await?)
}

async fn find_owned_item<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    item_id: Uuid,
) -> Result<order_item::Model, ServiceError> {
    let item = order_item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;
    if item.order_id != order_id {
        return Err(ServiceError::ValidationError(format!(
            "Item {} does not belong to order {}",
            item_id, order_id
        )));
    }
    Ok(item)
}

async fn load_details<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<OrderDetails, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::CreatedAt)
        .all(conn)
        .await?;

    let payments = payment::Entity::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let location = order_location(conn, &order).await?;
    let effective_location = effective_location_name(&order, location.as_ref());
    let payment_status = crate::services::payments::derive_status(
        &order,
        effective_location.as_deref(),
        &payments,
    );

    let paid = net_paid(&payments);
    let balance_due = (order.total_price - paid).max(Decimal::ZERO);
    let amount_overpaid = (paid - order.total_price).max(Decimal::ZERO);
    let elapsed = time_ago(order.updated_at.unwrap_or(order.created_at), Utc::now());

    Ok(OrderDetails {
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                id: item.id,
                menu_item_id: item.menu_item_id,
                item_name: item.item_name,
                item_type: item.item_type,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
            })
            .collect(),
        amount_paid: paid,
        balance_due,
        amount_overpaid,
        payment_status,
        effective_delivery_location: effective_location,
        time_ago: elapsed,
        order: model_to_response(order),
    })
}

fn model_to_response(model: order::Model) -> OrderResponse {
    OrderResponse {
        id: model.id,
        order_number: model.order_number,
        status: model.status,
        delivery_type: model.delivery_type,
        total_price: model.total_price,
        delivery_fee: model.delivery_fee,
        delivery_location_id: model.delivery_location_id,
        delivery_location_name: model.delivery_location_name,
        delivery_location_fee: model.delivery_location_fee,
        custom_delivery_location: model.custom_delivery_location,
        custom_delivery_fee: model.custom_delivery_fee,
        customer_phone: model.customer_phone,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
