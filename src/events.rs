//! Outbound domain events, published over NATS when configured.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    OrderCreated {
        order_id: Uuid,
        customer_id: Uuid,
        total: i64,
    },
    EmptyCartsReaped {
        count: u64,
    },
}

impl StoreEvent {
    fn subject(&self) -> &'static str {
        match self {
            StoreEvent::OrderCreated { .. } => "store.order.created",
            StoreEvent::EmptyCartsReaped { .. } => "store.cart.reaped",
        }
    }
}

/// Fire-and-forget publisher. A missing NATS connection downgrades every
/// publish to a debug log; event delivery is never on a request's critical
/// path.
#[derive(Clone)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub async fn publish(&self, event: StoreEvent) {
        let Some(client) = &self.client else {
            tracing::debug!(?event, "event publishing disabled, dropping");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, ?event, "failed to serialize event");
                return;
            }
        };
        if let Err(e) = client
            .publish(event.subject().to_string(), payload.into())
            .await
        {
            tracing::warn!(error = %e, subject = event.subject(), "failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_map_to_their_subjects() {
        let order = StoreEvent::OrderCreated {
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            total: 450,
        };
        assert_eq!(order.subject(), "store.order.created");
        assert_eq!(
            StoreEvent::EmptyCartsReaped { count: 3 }.subject(),
            "store.cart.reaped"
        );
    }

    #[test]
    fn order_created_serializes_with_type_tag() {
        let event = StoreEvent::OrderCreated {
            order_id: Uuid::nil(),
            customer_id: Uuid::nil(),
            total: 100,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "order_created");
        assert_eq!(value["total"], 100);
    }
}
