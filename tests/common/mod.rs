#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use frontdesk_core::db::{self, DbPool};
use frontdesk_core::entities::order::DeliveryType;
use frontdesk_core::entities::order_item::ItemType;
use frontdesk_core::events::{Event, EventSender};
use frontdesk_core::services::deliveries::CreateRiderRequest;
use frontdesk_core::services::locations::{CreateLocationRequest, LocationResponse};
use frontdesk_core::services::orders::{CreateOrderRequest, OrderItemInput};
use frontdesk_core::services::pricing::MenuItemSnapshot;
use frontdesk_core::AppServices;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const PHONE: &str = "0244123456";

/// Test harness over a fresh in-memory SQLite database built from the
/// entity schema. One connection, so every test sees its own database.
pub struct TestCore {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub events: mpsc::Receiver<Event>,
}

pub async fn setup() -> TestCore {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let db = Arc::new(
        Database::connect(options)
            .await
            .expect("connect in-memory sqlite"),
    );
    db::init_schema(&*db).await.expect("create schema");

    let (tx, rx) = mpsc::channel(1024);
    let services = AppServices::new(db.clone(), Some(Arc::new(EventSender::new(tx))));

    TestCore {
        db,
        services,
        events: rx,
    }
}

pub fn menu_item(name: &str, unit_price: Decimal) -> MenuItemSnapshot {
    MenuItemSnapshot::new(Some(Uuid::new_v4()), name, ItemType::Regular, unit_price)
        .expect("valid menu item fixture")
}

pub fn item_input(name: &str, unit_price: Decimal, quantity: i32) -> OrderItemInput {
    OrderItemInput {
        item: menu_item(name, unit_price),
        quantity,
    }
}

/// The worked example used across the suite: 2 x Rice @ 25.00 plus
/// 1 x Chicken @ 35.00, for an item total of 85.00.
pub fn standard_items() -> Vec<OrderItemInput> {
    vec![
        item_input("Rice", Decimal::new(2500, 2), 2),
        item_input("Chicken", Decimal::new(3500, 2), 1),
    ]
}

pub fn pickup_order(items: Vec<OrderItemInput>) -> CreateOrderRequest {
    CreateOrderRequest {
        delivery_type: DeliveryType::Pickup,
        delivery_location_id: None,
        custom_delivery_location: None,
        custom_delivery_fee: None,
        customer_phone: None,
        notes: None,
        items,
    }
}

pub fn delivery_order(location_id: Uuid, items: Vec<OrderItemInput>) -> CreateOrderRequest {
    CreateOrderRequest {
        delivery_type: DeliveryType::Delivery,
        delivery_location_id: Some(location_id),
        custom_delivery_location: None,
        custom_delivery_fee: None,
        customer_phone: Some(PHONE.to_string()),
        notes: None,
        items,
    }
}

pub async fn create_location(
    services: &AppServices,
    name: &str,
    fee: Decimal,
) -> LocationResponse {
    services
        .locations
        .create_location(CreateLocationRequest {
            name: name.to_string(),
            fee,
            is_active: true,
        })
        .await
        .expect("create location fixture")
}

pub async fn create_rider(
    services: &AppServices,
    name: &str,
    capacity: i32,
) -> frontdesk_core::services::deliveries::RiderResponse {
    services
        .deliveries
        .create_rider(CreateRiderRequest {
            name: name.to_string(),
            phone: PHONE.to_string(),
            max_concurrent_orders: capacity,
        })
        .await
        .expect("create rider fixture")
}
