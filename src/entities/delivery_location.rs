use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `delivery_locations` table: the delivery catalog, one row per named
/// area with its flat fee. Orders snapshot name and fee at save time, so
/// rows here can be repriced or deleted without rewriting order history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub fee: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Third-party delivery partners whose orders arrive pre-settled: the
/// partner collects payment, so the ledger reports a fixed status and no
/// in-house rider may be assigned.
///
/// Channels are recognized by the location's display name. A first-class
/// `fulfillment_channel` column would be cleaner, but the name match is the
/// established contract with the ordering frontends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalChannel {
    Bolt,
    Wix,
}

impl ExternalChannel {
    pub const BOLT_LOCATION: &'static str = "Bolt Delivery";
    pub const WIX_LOCATION: &'static str = "Wix Delivery";

    /// Matches a location display name against the known partner channels.
    pub fn from_location_name(name: &str) -> Option<Self> {
        match name {
            Self::BOLT_LOCATION => Some(ExternalChannel::Bolt),
            Self::WIX_LOCATION => Some(ExternalChannel::Wix),
            _ => None,
        }
    }

    pub fn location_name(&self) -> &'static str {
        match self {
            ExternalChannel::Bolt => Self::BOLT_LOCATION,
            ExternalChannel::Wix => Self::WIX_LOCATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_partner_locations_by_exact_name() {
        assert_eq!(
            ExternalChannel::from_location_name("Bolt Delivery"),
            Some(ExternalChannel::Bolt)
        );
        assert_eq!(
            ExternalChannel::from_location_name("Wix Delivery"),
            Some(ExternalChannel::Wix)
        );
        assert_eq!(ExternalChannel::from_location_name("Osu"), None);
        assert_eq!(ExternalChannel::from_location_name("bolt delivery"), None);
    }
}
