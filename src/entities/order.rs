use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the possible statuses of an order.
///
/// `Fulfilled` and `Cancelled` are terminal.
#[derive(
    Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Accepted")]
    Accepted,
    #[sea_orm(string_value = "Ready")]
    Ready,
    #[sea_orm(string_value = "Out for Delivery")]
    #[strum(serialize = "Out for Delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "Fulfilled")]
    Fulfilled,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }
}

/// Enum representing how an order reaches the customer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DeliveryType {
    #[sea_orm(string_value = "Pickup")]
    Pickup,
    #[sea_orm(string_value = "Delivery")]
    Delivery,
}

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique order number in `DDMMYY-NNN` format, sequenced per day.
    #[sea_orm(unique)]
    pub order_number: String,

    pub status: OrderStatus,
    pub delivery_type: DeliveryType,

    /// Item subtotals plus the resolved delivery fee.
    pub total_price: Decimal,
    pub delivery_fee: Decimal,

    /// Reference to a catalog delivery location. Mutually exclusive with the
    /// custom location fields; cleared when the location record is deleted.
    pub delivery_location_id: Option<Uuid>,

    /// Historical snapshot of the location name, captured at save time so the
    /// order stays self-consistent after catalog changes.
    pub delivery_location_name: Option<String>,
    /// Historical snapshot of the location fee.
    pub delivery_location_fee: Option<Decimal>,

    /// Free-form location for deliveries outside the catalog.
    pub custom_delivery_location: Option<String>,
    pub custom_delivery_fee: Option<Decimal>,

    pub customer_phone: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
    #[sea_orm(has_one = "super::order_assignment::Entity")]
    OrderAssignment,
    #[sea_orm(
        belongs_to = "super::delivery_location::Entity",
        from = "Column::DeliveryLocationId",
        to = "super::delivery_location::Column::Id"
    )]
    DeliveryLocation,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::order_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderAssignment.def()
    }
}

impl Related<super::delivery_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryLocation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
