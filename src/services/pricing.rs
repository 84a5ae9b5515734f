//! Pricing ledger: pure computation of item subtotals, delivery fees, and
//! order totals, plus the typed snapshot inputs captured at creation points.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::delivery_location;
use crate::entities::order::{self, DeliveryType};
use crate::entities::order_item::{self, ItemType};
use crate::errors::ServiceError;

/// Monetary amounts are fixed-point with two decimal places.
pub const MONEY_DP: u32 = 2;

/// Denormalized menu data captured once when an item is attached to an
/// order. The snapshot, not the live menu record, is what the order keeps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MenuItemSnapshot {
    pub menu_item_id: Option<Uuid>,
    pub name: String,
    pub item_type: ItemType,
    pub unit_price: Decimal,
}

impl MenuItemSnapshot {
    pub fn new(
        menu_item_id: Option<Uuid>,
        name: impl Into<String>,
        item_type: ItemType,
        unit_price: Decimal,
    ) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Item name must not be empty".to_string(),
            ));
        }
        if unit_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Unit price must be positive, got {}",
                unit_price
            )));
        }
        Ok(Self {
            menu_item_id,
            name,
            item_type,
            unit_price: unit_price.round_dp(MONEY_DP),
        })
    }
}

/// Location data captured on an order before the referenced catalog row can
/// change or disappear.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub name: String,
    pub fee: Decimal,
}

impl LocationSnapshot {
    pub fn from_location(location: &delivery_location::Model) -> Self {
        Self {
            name: location.name.clone(),
            fee: location.fee,
        }
    }

    pub fn custom(name: impl Into<String>, fee: Decimal) -> Self {
        Self {
            name: name.into(),
            fee: fee.round_dp(MONEY_DP),
        }
    }
}

/// Subtotal for one order line. Rejects non-positive quantity or unit price.
pub fn line_subtotal(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::ValidationError(format!(
            "Quantity must be at least 1, got {}",
            quantity
        )));
    }
    if unit_price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Unit price must be positive, got {}",
            unit_price
        )));
    }
    Ok((Decimal::from(quantity) * unit_price).round_dp(MONEY_DP))
}

/// Sum of the stored line subtotals.
pub fn items_total(items: &[order_item::Model]) -> Decimal {
    items
        .iter()
        .map(|item| item.subtotal)
        .sum::<Decimal>()
        .round_dp(MONEY_DP)
}

/// Resolves the delivery fee for an order.
///
/// Resolution order: the referenced location's current fee when the row
/// still exists, then the custom fee, then the historical snapshot fee when
/// neither is set, and zero for pickup or when nothing applies.
pub fn resolve_delivery_fee(
    order: &order::Model,
    location: Option<&delivery_location::Model>,
) -> Decimal {
    if order.delivery_type == DeliveryType::Pickup {
        return Decimal::ZERO;
    }
    if let Some(location) = location {
        return location.fee;
    }
    if let Some(fee) = order.custom_delivery_fee {
        return fee;
    }
    if let Some(fee) = order.delivery_location_fee {
        return fee;
    }
    Decimal::ZERO
}

/// Order total: item subtotals plus the resolved delivery fee.
pub fn order_total(items_total: Decimal, delivery_fee: Decimal) -> Decimal {
    (items_total + delivery_fee).round_dp(MONEY_DP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order_fixture(delivery_type: DeliveryType) -> order::Model {
        order::Model {
            id: Uuid::new_v4(),
            order_number: "010125-001".to_string(),
            status: order::OrderStatus::Pending,
            delivery_type,
            total_price: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            delivery_location_id: None,
            delivery_location_name: None,
            delivery_location_fee: None,
            custom_delivery_location: None,
            custom_delivery_fee: None,
            customer_phone: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn location_fixture(fee: Decimal) -> delivery_location::Model {
        delivery_location::Model {
            id: Uuid::new_v4(),
            name: "Osu".to_string(),
            fee,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn line_subtotal_multiplies_and_rounds() {
        assert_eq!(line_subtotal(2, dec!(25.00)).unwrap(), dec!(50.00));
        assert_eq!(line_subtotal(3, dec!(9.995)).unwrap(), dec!(29.98));
    }

    #[test]
    fn line_subtotal_rejects_bad_inputs() {
        assert_matches!(
            line_subtotal(0, dec!(5.00)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            line_subtotal(1, dec!(0.00)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            line_subtotal(1, dec!(-1.00)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn pickup_orders_never_carry_a_fee() {
        let mut order = order_fixture(DeliveryType::Pickup);
        order.delivery_location_fee = Some(dec!(10.00));
        order.custom_delivery_fee = Some(dec!(7.00));
        let location = location_fixture(dec!(12.00));
        assert_eq!(resolve_delivery_fee(&order, Some(&location)), dec!(0.00));
    }

    #[test]
    fn live_location_fee_wins_over_snapshot() {
        let mut order = order_fixture(DeliveryType::Delivery);
        order.delivery_location_fee = Some(dec!(8.00));
        let location = location_fixture(dec!(12.00));
        assert_eq!(resolve_delivery_fee(&order, Some(&location)), dec!(12.00));
    }

    #[test]
    fn custom_fee_applies_when_no_location() {
        let mut order = order_fixture(DeliveryType::Delivery);
        order.custom_delivery_location = Some("Auntie's house".to_string());
        order.custom_delivery_fee = Some(dec!(15.00));
        assert_eq!(resolve_delivery_fee(&order, None), dec!(15.00));
    }

    #[test]
    fn snapshot_fee_survives_location_deletion() {
        let mut order = order_fixture(DeliveryType::Delivery);
        order.delivery_location_name = Some("Osu".to_string());
        order.delivery_location_fee = Some(dec!(10.00));
        assert_eq!(resolve_delivery_fee(&order, None), dec!(10.00));
    }

    #[test]
    fn delivery_with_nothing_set_is_free() {
        let order = order_fixture(DeliveryType::Delivery);
        assert_eq!(resolve_delivery_fee(&order, None), dec!(0.00));
    }

    #[test]
    fn menu_item_snapshot_rejects_non_positive_price() {
        assert_matches!(
            MenuItemSnapshot::new(None, "Rice", ItemType::Regular, dec!(0.00)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            MenuItemSnapshot::new(None, "  ", ItemType::Regular, dec!(5.00)),
            Err(ServiceError::ValidationError(_))
        );
    }
}
