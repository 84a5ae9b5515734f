//! Delivery catalog and historical snapshot preservation.
//!
//! Orders denormalize the name and fee of the location they reference.
//! Before a catalog row can be deleted or swapped out, the data already
//! consumed by orders is archived into those snapshot columns, so order
//! history never degrades. Deletion follows a two-phase contract:
//! references are archived first, then the reference is cleared, then the
//! row goes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, DbPool};
use crate::entities::{delivery_location, order};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::pricing::LocationSnapshot;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 100, message = "Location name is required"))]
    pub name: String,
    pub fee: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, max = 100, message = "Location name must not be empty"))]
    pub name: Option<String>,
    pub fee: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationResponse {
    pub id: Uuid,
    pub name: String,
    pub fee: Decimal,
    pub is_active: bool,
}

/// Service owning the delivery catalog and the snapshot lifecycle around it.
#[derive(Clone)]
pub struct LocationService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl LocationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Adds a location to the catalog. Names are unique.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_location(
        &self,
        request: CreateLocationRequest,
    ) -> Result<LocationResponse, ServiceError> {
        request.validate()?;
        if request.fee < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Delivery fee cannot be negative, got {}",
                request.fee
            )));
        }

        let now = Utc::now();
        let active = delivery_location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.clone()),
            fee: Set(request.fee),
            is_active: Set(request.is_active),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let location = active.insert(&*self.db_pool).await.map_err(|e| {
            ServiceError::from_db_err(e, "A location with this name already exists")
        })?;

        info!(location_id = %location.id, name = %location.name, "delivery location created");
        Ok(location_to_response(location))
    }

    /// Updates a catalog row. Snapshots on existing orders are untouched;
    /// they keep the data the order was saved with.
    #[instrument(skip(self, request), fields(location_id = %location_id))]
    pub async fn update_location(
        &self,
        location_id: Uuid,
        request: UpdateLocationRequest,
    ) -> Result<LocationResponse, ServiceError> {
        request.validate()?;
        if let Some(fee) = request.fee {
            if fee < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Delivery fee cannot be negative, got {}",
                    fee
                )));
            }
        }

        let db = &*self.db_pool;
        let location = delivery_location::Entity::find_by_id(location_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Location {} not found", location_id))
            })?;

        let mut active: delivery_location::ActiveModel = location.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(fee) = request.fee {
            active.fee = Set(fee);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            ServiceError::from_db_err(e, "A location with this name already exists")
        })?;
        Ok(location_to_response(updated))
    }

    /// Takes a location off the active list without touching order history.
    #[instrument(skip(self), fields(location_id = %location_id))]
    pub async fn deactivate_location(
        &self,
        location_id: Uuid,
    ) -> Result<LocationResponse, ServiceError> {
        self.update_location(
            location_id,
            UpdateLocationRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Read-only: locations currently offered for delivery.
    #[instrument(skip(self))]
    pub async fn active_locations(&self) -> Result<Vec<LocationResponse>, ServiceError> {
        let locations = delivery_location::Entity::find()
            .filter(delivery_location::Column::IsActive.eq(true))
            .order_by_asc(delivery_location::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(locations.into_iter().map(location_to_response).collect())
    }

    /// Phase one of deletion, also callable on its own: copies the
    /// location's name and fee onto every order that references it and has
    /// no snapshot yet. Returns the number of orders touched.
    #[instrument(skip(self), fields(location_id = %location_id))]
    pub async fn archive_references(&self, location_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin archive txn", || db.begin()).await?;

        let location = delivery_location::Entity::find_by_id(location_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Location {} not found", location_id))
            })?;

        let archived = archive_references_in(&txn, &location).await?;
        txn.commit().await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::LocationArchived {
                    location_id,
                    orders_archived: archived,
                })
                .await
            {
                warn!(error = %e, location_id = %location_id, "failed to send archive event");
            }
        }

        Ok(archived)
    }

    /// Deletes a catalog row under the two-phase contract: archive the data
    /// consumed by orders, clear their references, then delete. All in one
    /// transaction, so no order ever sees a dangling reference without a
    /// snapshot.
    #[instrument(skip(self), fields(location_id = %location_id))]
    pub async fn delete_location(&self, location_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin location delete txn", || db.begin()).await?;

        let location = delivery_location::Entity::find_by_id(location_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Location {} not found", location_id))
            })?;

        let archived = archive_references_in(&txn, &location).await?;

        order::Entity::update_many()
            .col_expr(
                order::Column::DeliveryLocationId,
                Expr::value(sea_orm::Value::Uuid(None)),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::DeliveryLocationId.eq(location_id))
            .exec(&txn)
            .await?;

        delivery_location::Entity::delete_by_id(location_id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(location_id = %location_id, name = %location.name, archived = archived, "delivery location deleted");

        if let Some(event_sender) = &self.event_sender {
            let _ = event_sender
                .send(Event::LocationArchived {
                    location_id,
                    orders_archived: archived,
                })
                .await;
            if let Err(e) = event_sender.send(Event::LocationDeleted(location_id)).await {
                warn!(error = %e, location_id = %location_id, "failed to send delete event");
            }
        }

        Ok(archived)
    }

    /// Reconciliation pass over the whole order table, for use before bulk
    /// catalog reloads: fills any missing snapshot from the referenced
    /// location or the custom location fields. With `force`, existing
    /// snapshots of referenced locations are resynced too.
    #[instrument(skip(self))]
    pub async fn reconcile_snapshots(&self, force: bool) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let txn = db::with_retry("begin reconcile txn", || db.begin()).await?;

        let locations: HashMap<Uuid, delivery_location::Model> =
            delivery_location::Entity::find()
                .all(&txn)
                .await?
                .into_iter()
                .map(|location| (location.id, location))
                .collect();

        let mut candidates = order::Entity::find()
            .filter(order::Column::DeliveryLocationId.is_not_null());
        if !force {
            candidates = candidates.filter(order::Column::DeliveryLocationName.is_null());
        }
        let referenced = candidates.all(&txn).await?;

        let mut updated = 0u64;
        for row in referenced {
            let location_id = row
                .delivery_location_id
                .expect("filtered on non-null reference");
            let Some(location) = locations.get(&location_id) else {
                warn!(order_id = %row.id, location_id = %location_id, "order references a missing location");
                continue;
            };
            let snapshot = LocationSnapshot::from_location(location);
            apply_snapshot(&txn, row.id, &snapshot).await?;
            updated += 1;
        }

        // Custom-location orders carry their data in the custom columns;
        // mirror it into the snapshot columns when absent.
        let customs = order::Entity::find()
            .filter(order::Column::DeliveryLocationId.is_null())
            .filter(order::Column::CustomDeliveryLocation.is_not_null())
            .filter(order::Column::DeliveryLocationName.is_null())
            .all(&txn)
            .await?;
        for row in customs {
            let name = row
                .custom_delivery_location
                .clone()
                .expect("filtered on non-null custom location");
            let fee = row.custom_delivery_fee.unwrap_or(Decimal::ZERO);
            let snapshot = LocationSnapshot::custom(name, fee);
            apply_snapshot(&txn, row.id, &snapshot).await?;
            updated += 1;
        }

        txn.commit().await?;

        info!(updated = updated, force = force, "snapshot reconciliation complete");
        Ok(updated)
    }
}

/// Copies the location's data onto every referencing order whose snapshot is
/// still empty. Populated snapshots are left alone.
async fn archive_references_in<C: sea_orm::ConnectionTrait>(
    conn: &C,
    location: &delivery_location::Model,
) -> Result<u64, ServiceError> {
    let result = order::Entity::update_many()
        .col_expr(
            order::Column::DeliveryLocationName,
            Expr::value(location.name.clone()),
        )
        .col_expr(order::Column::DeliveryLocationFee, Expr::value(location.fee))
        .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(order::Column::DeliveryLocationId.eq(location.id))
        .filter(order::Column::DeliveryLocationName.is_null())
        .exec(conn)
        .await?;

    if result.rows_affected > 0 {
        info!(
            location_id = %location.id,
            orders = result.rows_affected,
            "location data archived onto referencing orders"
        );
    }
    Ok(result.rows_affected)
}

async fn apply_snapshot<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    snapshot: &LocationSnapshot,
) -> Result<(), ServiceError> {
    let update = order::ActiveModel {
        id: Set(order_id),
        delivery_location_name: Set(Some(snapshot.name.clone())),
        delivery_location_fee: Set(Some(snapshot.fee)),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    update.update(conn).await?;
    Ok(())
}

fn location_to_response(model: delivery_location::Model) -> LocationResponse {
    LocationResponse {
        id: model.id,
        name: model.name,
        fee: model.fee,
        is_active: model.is_active,
    }
}
