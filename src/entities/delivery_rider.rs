use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RiderStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Inactive")]
    Inactive,
    #[sea_orm(string_value = "Busy")]
    Busy,
}

/// The `delivery_riders` table.
///
/// `current_orders` mirrors the count of the rider's non-terminal
/// assignments; it is recounted from assignment rows on every terminal
/// transition so drift self-heals.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_riders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: RiderStatus,
    pub current_orders: i32,
    pub total_deliveries: i32,
    pub today_deliveries: i32,
    pub max_concurrent_orders: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn can_accept_orders(&self) -> bool {
        self.status == RiderStatus::Active
            && self.is_available
            && self.current_orders < self.max_concurrent_orders
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_assignment::Entity")]
    OrderAssignment,
}

impl Related<super::order_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
