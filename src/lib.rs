//! # frontdesk-core
//!
//! The order, payment, and delivery consistency engine behind a restaurant
//! front desk. The crate owns the invariants and derived state of the order
//! lifecycle — pricing, payment reconciliation, rider assignment under
//! capacity constraints, and preservation of historical pricing/location
//! data — and exposes them as typed application services over sea-orm.
//!
//! Request handling, authentication, exports, spreadsheet sync, and push
//! transports are collaborators that call into this crate with validated
//! payloads and subscribe to its [`events::Event`] stream after commit.
//!
//! ```no_run
//! use std::sync::Arc;
//! use frontdesk_core::{db, AppServices};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pool = Arc::new(db::establish_connection("sqlite::memory:").await?);
//! db::init_schema(&*pool).await?;
//!
//! let (tx, _rx) = mpsc::channel(64);
//! let services = AppServices::new(pool, Some(Arc::new(frontdesk_core::events::EventSender::new(tx))));
//! let _locations = services.locations.active_locations().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod propagation;
pub mod services;

use std::sync::Arc;

pub use config::AppConfig;
pub use db::DbPool;
pub use errors::ServiceError;
pub use events::{Event, EventSender};

use services::deliveries::DeliveryService;
use services::locations::LocationService;
use services::orders::OrderService;
use services::payments::PaymentService;

/// The bundle of core services, sharing one pool and one event channel.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub payments: PaymentService,
    pub deliveries: DeliveryService,
    pub locations: LocationService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            orders: OrderService::new(db_pool.clone(), event_sender.clone()),
            payments: PaymentService::new(db_pool.clone(), event_sender.clone()),
            deliveries: DeliveryService::new(db_pool.clone(), event_sender.clone()),
            locations: LocationService::new(db_pool, event_sender),
        }
    }
}
