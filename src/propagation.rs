//! Change propagation: recomputes an order's derived pricing fields after
//! item, payment, or assignment mutations.
//!
//! Recomputation is driven by explicit service calls, never by save hooks.
//! A [`RecomputeContext`] travels through the call chain and marks orders
//! whose recompute is in progress, so a recompute that saves the order can
//! never re-trigger itself.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{delivery_location, order, order_item};
use crate::errors::ServiceError;
use crate::services::pricing;

/// Per-call recursion guard. Owned by the operation that starts a mutation
/// and passed down; never shared across requests.
#[derive(Debug, Default)]
pub struct RecomputeContext {
    in_progress: HashSet<Uuid>,
}

impl RecomputeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the order as being recomputed. Returns false when a recompute
    /// for it is already on the stack.
    fn enter(&mut self, order_id: Uuid) -> bool {
        self.in_progress.insert(order_id)
    }

    fn exit(&mut self, order_id: Uuid) {
        self.in_progress.remove(&order_id);
    }
}

/// Recomputes `total_price` and `delivery_fee` for the order and persists
/// only those fields (plus `updated_at`). Returns the new total, or `None`
/// when the call was suppressed by the re-entrancy guard.
pub async fn recompute_order<C: ConnectionTrait>(
    ctx: &mut RecomputeContext,
    conn: &C,
    order_id: Uuid,
) -> Result<Option<Decimal>, ServiceError> {
    if !ctx.enter(order_id) {
        debug!(order_id = %order_id, "recompute already in progress, skipping");
        return Ok(None);
    }

    // The marker must clear on every exit path, including errors.
    let result = recompute_inner(conn, order_id).await;
    ctx.exit(order_id);

    result.map(Some)
}

async fn recompute_inner<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let location = match order.delivery_location_id {
        Some(location_id) => {
            delivery_location::Entity::find_by_id(location_id)
                .one(conn)
                .await?
        }
        None => None,
    };

    let delivery_fee = pricing::resolve_delivery_fee(&order, location.as_ref());
    let total_price = pricing::order_total(pricing::items_total(&items), delivery_fee);

    if total_price != order.total_price || delivery_fee != order.delivery_fee {
        let update = order::ActiveModel {
            id: Set(order_id),
            total_price: Set(total_price),
            delivery_fee: Set(delivery_fee),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        update.update(conn).await?;
        debug!(order_id = %order_id, total = %total_price, fee = %delivery_fee, "order totals recomputed");
    }

    Ok(total_price)
}
