use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a rider assignment, independent of the order's own status.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AssignmentStatus {
    #[sea_orm(string_value = "Assigned")]
    Assigned,
    #[sea_orm(string_value = "Accepted")]
    Accepted,
    #[sea_orm(string_value = "Picked Up")]
    #[strum(serialize = "Picked Up")]
    PickedUp,
    #[sea_orm(string_value = "In Transit")]
    #[strum(serialize = "In Transit")]
    InTransit,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Returned")]
    Returned,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl AssignmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Delivered | AssignmentStatus::Returned | AssignmentStatus::Cancelled
        )
    }

    /// Statuses that hold a slot of the rider's concurrent capacity.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// The `order_assignments` table. The unique constraint on `order_id` is the
/// storage-level backstop for the one-assignment-per-order invariant.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub status: AssignmentStatus,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_instructions: Option<String>,
    pub delivery_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::delivery_rider::Entity",
        from = "Column::RiderId",
        to = "super::delivery_rider::Column::Id"
    )]
    Rider,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::delivery_rider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
