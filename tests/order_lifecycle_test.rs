mod common;

use assert_matches::assert_matches;
use frontdesk_core::entities::order::{DeliveryType, OrderStatus};
use frontdesk_core::services::orders::{ItemChange, UpdateOrderRequest};
use frontdesk_core::services::payments::RecordPaymentRequest;
use frontdesk_core::entities::payment::PaymentMethod;
use frontdesk_core::ServiceError;
use regex::Regex;
use rust_decimal_macros::dec;

use common::{
    create_location, delivery_order, item_input, menu_item, pickup_order, setup, standard_items,
    PHONE,
};

#[tokio::test]
async fn pickup_order_totals_and_initial_status() {
    let core = setup().await;

    let details = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    assert_eq!(details.order.status, OrderStatus::Pending);
    assert_eq!(details.order.delivery_fee, dec!(0.00));
    assert_eq!(details.order.total_price, dec!(85.00));
    assert_eq!(details.items.len(), 2);
    assert_eq!(details.balance_due, dec!(85.00));
}

#[tokio::test]
async fn delivery_orders_start_accepted() {
    let core = setup().await;
    let location = create_location(&core.services, "Osu", dec!(10.00)).await;

    let details = core
        .services
        .orders
        .create_order(delivery_order(location.id, standard_items()))
        .await
        .unwrap();

    assert_eq!(details.order.status, OrderStatus::Accepted);
    assert_eq!(details.order.delivery_fee, dec!(10.00));
    assert_eq!(details.order.total_price, dec!(95.00));
    assert_eq!(details.order.delivery_location_name.as_deref(), Some("Osu"));
    assert_eq!(details.order.delivery_location_fee, Some(dec!(10.00)));
}

#[tokio::test]
async fn order_numbers_are_date_prefixed_and_sequential() {
    let core = setup().await;
    let pattern = Regex::new(r"^\d{6}-\d{3}$").unwrap();

    let first = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();
    let second = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    assert!(pattern.is_match(&first.order.order_number));
    assert!(pattern.is_match(&second.order.order_number));
    assert!(first.order.order_number.ends_with("-001"));
    assert!(second.order.order_number.ends_with("-002"));
}

#[tokio::test]
async fn switching_disposition_recomputes_the_fee() {
    let core = setup().await;
    let location = create_location(&core.services, "Osu", dec!(10.00)).await;

    let created = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();
    assert_eq!(created.order.total_price, dec!(85.00));

    let as_delivery = core
        .services
        .orders
        .update_order(
            created.order.id,
            UpdateOrderRequest {
                delivery_type: Some(DeliveryType::Delivery),
                delivery_location_id: Some(location.id),
                customer_phone: Some(PHONE.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(as_delivery.order.delivery_fee, dec!(10.00));
    assert_eq!(as_delivery.order.total_price, dec!(95.00));

    let back_to_pickup = core
        .services
        .orders
        .update_order(
            created.order.id,
            UpdateOrderRequest {
                delivery_type: Some(DeliveryType::Pickup),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(back_to_pickup.order.delivery_fee, dec!(0.00));
    assert_eq!(back_to_pickup.order.total_price, dec!(85.00));
}

#[tokio::test]
async fn item_changes_propagate_to_the_total() {
    let core = setup().await;

    let created = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    let with_extra = core
        .services
        .orders
        .apply_item_change(
            created.order.id,
            ItemChange::Add {
                item: menu_item("Kelewele", dec!(12.50)),
                quantity: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(with_extra.order.total_price, dec!(110.00));

    let rice = with_extra
        .items
        .iter()
        .find(|item| item.item_name == "Rice")
        .unwrap();
    let more_rice = core
        .services
        .orders
        .apply_item_change(
            created.order.id,
            ItemChange::UpdateQuantity {
                item_id: rice.id,
                quantity: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(more_rice.order.total_price, dec!(135.00));

    let kelewele = more_rice
        .items
        .iter()
        .find(|item| item.item_name == "Kelewele")
        .unwrap();
    let removed = core
        .services
        .orders
        .apply_item_change(
            created.order.id,
            ItemChange::Remove {
                item_id: kelewele.id,
            },
        )
        .await
        .unwrap();
    assert_eq!(removed.order.total_price, dec!(110.00));

    // Invariant: total always equals item subtotals plus fee.
    let item_sum: rust_decimal::Decimal = removed.items.iter().map(|i| i.subtotal).sum();
    assert_eq!(
        removed.order.total_price,
        item_sum + removed.order.delivery_fee
    );
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let core = setup().await;

    let created = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    let first = core
        .services
        .orders
        .recompute_totals(created.order.id)
        .await
        .unwrap();
    let second = core
        .services
        .orders
        .recompute_totals(created.order.id)
        .await
        .unwrap();

    assert_eq!(first, dec!(85.00));
    assert_eq!(second, dec!(85.00));
}

#[tokio::test]
async fn rejects_bad_quantities_prices_and_missing_fields() {
    let core = setup().await;

    let zero_quantity = core
        .services
        .orders
        .create_order(pickup_order(vec![item_input("Rice", dec!(25.00), 0)]))
        .await;
    assert_matches!(zero_quantity, Err(ServiceError::ValidationError(_)));

    let no_items = core.services.orders.create_order(pickup_order(vec![])).await;
    assert_matches!(no_items, Err(ServiceError::ValidationError(_)));

    // Delivery without a location is rejected.
    let mut request = pickup_order(standard_items());
    request.delivery_type = DeliveryType::Delivery;
    request.customer_phone = Some(PHONE.to_string());
    let no_location = core.services.orders.create_order(request).await;
    assert_matches!(no_location, Err(ServiceError::ValidationError(_)));

    // Delivery without a phone is rejected.
    let location = create_location(&core.services, "Osu", dec!(10.00)).await;
    let mut request = delivery_order(location.id, standard_items());
    request.customer_phone = None;
    let no_phone = core.services.orders.create_order(request).await;
    assert_matches!(no_phone, Err(ServiceError::ValidationError(_)));

    // A location reference and a custom location cannot coexist.
    let mut request = delivery_order(location.id, standard_items());
    request.custom_delivery_location = Some("Auntie's house".to_string());
    request.custom_delivery_fee = Some(dec!(5.00));
    let both = core.services.orders.create_order(request).await;
    assert_matches!(both, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn out_for_delivery_requires_delivery_disposition() {
    let core = setup().await;

    let pickup = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    let result = core
        .services
        .orders
        .update_status(pickup.order.id, OrderStatus::OutForDelivery)
        .await;
    assert_matches!(result, Err(ServiceError::InvariantViolation(_)));
}

#[tokio::test]
async fn fulfilled_requires_settled_payment() {
    let core = setup().await;

    let created = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    let unpaid = core
        .services
        .orders
        .update_status(created.order.id, OrderStatus::Fulfilled)
        .await;
    assert_matches!(unpaid, Err(ServiceError::InvariantViolation(_)));

    core.services
        .payments
        .record_payment(RecordPaymentRequest {
            order_id: created.order.id,
            amount: dec!(85.00),
            method: PaymentMethod::Cash,
            mobile_number: None,
            notes: None,
        })
        .await
        .unwrap();

    let fulfilled = core
        .services
        .orders
        .update_status(created.order.id, OrderStatus::Fulfilled)
        .await
        .unwrap();
    assert_eq!(fulfilled.status, OrderStatus::Fulfilled);
}

#[tokio::test]
async fn detaching_a_menu_item_keeps_the_denormalized_line() {
    let core = setup().await;

    let snapshot = menu_item("Jollof", dec!(30.00));
    let menu_item_id = snapshot.menu_item_id.unwrap();
    let created = core
        .services
        .orders
        .create_order(pickup_order(vec![frontdesk_core::services::orders::OrderItemInput {
            item: snapshot,
            quantity: 1,
        }]))
        .await
        .unwrap();

    let detached = core
        .services
        .orders
        .detach_menu_item(menu_item_id)
        .await
        .unwrap();
    assert_eq!(detached, 1);

    let details = core.services.orders.get_order(created.order.id).await.unwrap();
    let line = &details.items[0];
    assert_eq!(line.menu_item_id, None);
    assert_eq!(line.item_name, "Jollof");
    assert_eq!(line.unit_price, dec!(30.00));
    assert_eq!(details.order.total_price, dec!(30.00));
}

#[tokio::test]
async fn cancelling_records_the_reason() {
    let core = setup().await;

    let created = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    let cancelled = core
        .services
        .orders
        .cancel_order(created.order.id, Some("customer changed their mind".to_string()))
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(
        cancelled.notes.as_deref(),
        Some("customer changed their mind")
    );
}
