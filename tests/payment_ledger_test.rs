mod common;

use assert_matches::assert_matches;
use frontdesk_core::entities::delivery_location::ExternalChannel;
use frontdesk_core::entities::payment::{PaymentMethod, PaymentStatus};
use frontdesk_core::services::orders::OrderDetails;
use frontdesk_core::services::payments::{
    OrderPaymentStatus, RecordPaymentRequest, RecordRefundRequest,
};
use frontdesk_core::ServiceError;
use rust_decimal_macros::dec;

use common::{create_location, delivery_order, pickup_order, setup, standard_items};

async fn delivery_order_of_95(core: &common::TestCore) -> OrderDetails {
    let location = create_location(&core.services, "Osu", dec!(10.00)).await;
    core.services
        .orders
        .create_order(delivery_order(location.id, standard_items()))
        .await
        .unwrap()
}

fn cash(order_id: uuid::Uuid, amount: rust_decimal::Decimal) -> RecordPaymentRequest {
    RecordPaymentRequest {
        order_id,
        amount,
        method: PaymentMethod::Cash,
        mobile_number: None,
        notes: None,
    }
}

#[tokio::test]
async fn partial_payment_then_settlement_then_refund() {
    let core = setup().await;
    let order = delivery_order_of_95(&core).await;
    assert_eq!(order.order.total_price, dec!(95.00));

    core.services
        .payments
        .record_payment(cash(order.order.id, dec!(50.00)))
        .await
        .unwrap();
    let summary = core
        .services
        .payments
        .payment_summary(order.order.id)
        .await
        .unwrap();
    assert_eq!(summary.status, OrderPaymentStatus::PartiallyPaid);
    assert_eq!(summary.amount_paid, dec!(50.00));
    assert_eq!(summary.balance_due, dec!(45.00));

    core.services
        .payments
        .record_payment(cash(order.order.id, dec!(45.00)))
        .await
        .unwrap();
    let summary = core
        .services
        .payments
        .payment_summary(order.order.id)
        .await
        .unwrap();
    assert_eq!(summary.status, OrderPaymentStatus::Paid);
    assert_eq!(summary.balance_due, dec!(0.00));
    assert_eq!(summary.payment_mode, Some(PaymentMethod::Cash));

    core.services
        .payments
        .record_refund(RecordRefundRequest {
            order_id: order.order.id,
            amount: dec!(20.00),
            method: PaymentMethod::Cash,
            notes: None,
        })
        .await
        .unwrap();
    let summary = core
        .services
        .payments
        .payment_summary(order.order.id)
        .await
        .unwrap();
    assert_eq!(summary.status, OrderPaymentStatus::PartiallyPaid);
    assert_eq!(summary.amount_paid, dec!(75.00));
    assert_eq!(summary.balance_due, dec!(20.00));
}

#[tokio::test]
async fn overpayment_is_tracked() {
    let core = setup().await;
    let order = delivery_order_of_95(&core).await;

    core.services
        .payments
        .record_payment(cash(order.order.id, dec!(120.00)))
        .await
        .unwrap();

    let summary = core
        .services
        .payments
        .payment_summary(order.order.id)
        .await
        .unwrap();
    assert_eq!(summary.status, OrderPaymentStatus::Overpaid);
    assert_eq!(summary.amount_overpaid, dec!(25.00));
    assert_eq!(summary.balance_due, dec!(0.00));
}

#[tokio::test]
async fn refunds_cannot_exceed_net_paid() {
    let core = setup().await;
    let order = delivery_order_of_95(&core).await;

    core.services
        .payments
        .record_payment(cash(order.order.id, dec!(30.00)))
        .await
        .unwrap();

    let over_refund = core
        .services
        .payments
        .record_refund(RecordRefundRequest {
            order_id: order.order.id,
            amount: dec!(31.00),
            method: PaymentMethod::Cash,
            notes: None,
        })
        .await;
    assert_matches!(over_refund, Err(ServiceError::ValidationError(_)));

    // The rejected refund left no trace.
    let summary = core
        .services
        .payments
        .payment_summary(order.order.id)
        .await
        .unwrap();
    assert_eq!(summary.amount_paid, dec!(30.00));
}

#[tokio::test]
async fn gateway_payments_stay_pending_until_confirmed() {
    let core = setup().await;
    let order = delivery_order_of_95(&core).await;

    let pending = core
        .services
        .payments
        .record_payment(RecordPaymentRequest {
            order_id: order.order.id,
            amount: dec!(95.00),
            method: PaymentMethod::PaystackApi,
            mobile_number: Some("0244123456".to_string()),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(pending.status, PaymentStatus::Pending);

    let status = core
        .services
        .payments
        .payment_status(order.order.id)
        .await
        .unwrap();
    assert_eq!(status, OrderPaymentStatus::PendingPayment);

    core.services
        .payments
        .complete_payment(pending.id)
        .await
        .unwrap();
    let status = core
        .services
        .payments
        .payment_status(order.order.id)
        .await
        .unwrap();
    assert_eq!(status, OrderPaymentStatus::Paid);

    // Settling twice is rejected.
    let again = core.services.payments.complete_payment(pending.id).await;
    assert_matches!(again, Err(ServiceError::InvariantViolation(_)));
}

#[tokio::test]
async fn failed_gateway_payment_leaves_order_unpaid() {
    let core = setup().await;
    let order = delivery_order_of_95(&core).await;

    let pending = core
        .services
        .payments
        .record_payment(RecordPaymentRequest {
            order_id: order.order.id,
            amount: dec!(95.00),
            method: PaymentMethod::PaystackApi,
            mobile_number: Some("0244123456".to_string()),
            notes: None,
        })
        .await
        .unwrap();

    core.services.payments.fail_payment(pending.id).await.unwrap();

    let status = core
        .services
        .payments
        .payment_status(order.order.id)
        .await
        .unwrap();
    assert_eq!(status, OrderPaymentStatus::Unpaid);
}

#[tokio::test]
async fn cancelled_and_fully_refunded_order_reads_refunded() {
    let core = setup().await;
    let order = delivery_order_of_95(&core).await;

    core.services
        .payments
        .record_payment(cash(order.order.id, dec!(95.00)))
        .await
        .unwrap();
    core.services
        .orders
        .cancel_order(order.order.id, None)
        .await
        .unwrap();
    core.services
        .payments
        .record_refund(RecordRefundRequest {
            order_id: order.order.id,
            amount: dec!(95.00),
            method: PaymentMethod::Cash,
            notes: None,
        })
        .await
        .unwrap();

    let status = core
        .services
        .payments
        .payment_status(order.order.id)
        .await
        .unwrap();
    assert_eq!(status, OrderPaymentStatus::Refunded);
}

#[tokio::test]
async fn partner_channel_orders_are_pre_settled() {
    let core = setup().await;
    let bolt = create_location(
        &core.services,
        ExternalChannel::BOLT_LOCATION,
        dec!(0.00),
    )
    .await;

    // Partner orders carry no customer phone.
    let mut request = delivery_order(bolt.id, standard_items());
    request.customer_phone = None;
    let order = core.services.orders.create_order(request).await.unwrap();

    let status = core
        .services
        .payments
        .payment_status(order.order.id)
        .await
        .unwrap();
    assert_eq!(
        status,
        OrderPaymentStatus::ExternallySettled(ExternalChannel::Bolt)
    );
    assert_eq!(status.to_string(), "PAID ON BOLT");
    assert!(status.is_settled());

    // Fulfilment does not wait on payment rows for partner orders.
    let fulfilled = core
        .services
        .orders
        .update_status(
            order.order.id,
            frontdesk_core::entities::order::OrderStatus::Fulfilled,
        )
        .await
        .unwrap();
    assert_eq!(
        fulfilled.status,
        frontdesk_core::entities::order::OrderStatus::Fulfilled
    );
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let core = setup().await;
    let order = core
        .services
        .orders
        .create_order(pickup_order(standard_items()))
        .await
        .unwrap();

    let zero = core
        .services
        .payments
        .record_payment(cash(order.order.id, dec!(0.00)))
        .await;
    assert_matches!(zero, Err(ServiceError::ValidationError(_)));

    let negative = core
        .services
        .payments
        .record_refund(RecordRefundRequest {
            order_id: order.order.id,
            amount: dec!(-5.00),
            method: PaymentMethod::Cash,
            notes: None,
        })
        .await;
    assert_matches!(negative, Err(ServiceError::ValidationError(_)));
}
