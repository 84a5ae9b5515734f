use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a payment was taken.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "Cash")]
    Cash,
    #[sea_orm(string_value = "Telecel Cash")]
    #[strum(serialize = "Telecel Cash")]
    TelecelCash,
    #[sea_orm(string_value = "MTN MoMo")]
    #[strum(serialize = "MTN MoMo")]
    MtnMomo,
    #[sea_orm(string_value = "Paystack (API)")]
    #[strum(serialize = "Paystack (API)")]
    PaystackApi,
    #[sea_orm(string_value = "Paystack (USSD)")]
    #[strum(serialize = "Paystack (USSD)")]
    PaystackUssd,
    #[sea_orm(string_value = "Paid on Wix")]
    #[strum(serialize = "Paid on Wix")]
    Wix,
}

impl PaymentMethod {
    /// Methods settled in person at the counter, recorded as completed the
    /// moment they are entered. Gateway methods stay pending until confirmed.
    pub fn is_instant(&self) -> bool {
        !matches!(self, PaymentMethod::PaystackApi)
    }

    /// Methods through which cash can actually be handed back. Gateway and
    /// partner-settled methods cannot carry a refund.
    pub fn is_refundable(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Cash
                | PaymentMethod::TelecelCash
                | PaymentMethod::MtnMomo
                | PaymentMethod::PaystackUssd
        )
    }
}

/// Direction of a payment row.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentType {
    #[sea_orm(string_value = "Payment")]
    Payment,
    #[sea_orm(string_value = "Refund")]
    Refund,
}

/// Processing status of a single payment row. Only `Completed` rows count
/// toward the ledger.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Processing")]
    Processing,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Failed")]
    Failed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl PaymentStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

/// The `payments` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    #[sea_orm(unique)]
    pub reference: Uuid,
    pub mobile_number: Option<String>,
    pub notes: Option<String>,
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
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
