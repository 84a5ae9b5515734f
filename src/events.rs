use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::entities::order_assignment::AssignmentStatus;

/// Events emitted by the core services after their transaction commits.
/// Collaborators (spreadsheet sync, push notifications, audit log) subscribe
/// through the receiving end of the channel; nothing in the core blocks on
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderUpdated(Uuid),
    OrderCancelled(Uuid),
    OrderFulfilled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },

    // Payment events
    PaymentRecorded {
        order_id: Uuid,
        payment_id: Uuid,
    },
    PaymentRefunded {
        order_id: Uuid,
        payment_id: Uuid,
    },
    PaymentCompleted(Uuid),
    PaymentFailed(Uuid),

    // Assignment events
    AssignmentCreated {
        order_id: Uuid,
        rider_id: Uuid,
    },
    AssignmentStatusChanged {
        assignment_id: Uuid,
        old_status: AssignmentStatus,
        new_status: AssignmentStatus,
    },

    // Delivery catalog events
    LocationArchived {
        location_id: Uuid,
        orders_archived: u64,
    },
    LocationDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains an event channel, logging each event. Useful as the default
/// subscriber in binaries and tests that do not wire real collaborators.
pub async fn log_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event received");
    }
}
