use super::types::{EventSequence, UploadEvent, UploadEventPayload};
use crate::error::{Result, StorefrontError};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub type EventReceiver = broadcast::Receiver<UploadEvent>;
pub type EventSender = broadcast::Sender<UploadEvent>;

/// Default channel capacity; slow receivers past this see `Lagged`
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Event bus for distributing upload events
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: EventSender,
    sequence: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish an event (returns sequence number).
    ///
    /// Fails only when nobody is subscribed; the sequence number is consumed either way.
    pub fn publish(
        &self,
        item_id: &str,
        upload_id: &str,
        payload: UploadEventPayload,
    ) -> Result<EventSequence> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let event = UploadEvent {
            sequence,
            timestamp: Utc::now(),
            item_id: item_id.to_string(),
            upload_id: upload_id.to_string(),
            payload,
        };

        self.sender
            .send(event)
            .map(|_| sequence)
            .map_err(|e| StorefrontError::Other(format!("Failed to publish event: {}", e)))
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Next sequence number to be assigned
    pub fn current_sequence(&self) -> EventSequence {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let seq = bus
            .publish("item-1", "up-1", UploadEventPayload::Progress { percent: 40 })
            .unwrap();
        assert_eq!(seq, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.sequence, 1);
        assert_eq!(event.item_id, "item-1");
        assert_eq!(event.upload_id, "up-1");
        assert_eq!(event.payload_type(), "progress");
        assert!(event.is_progress());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(
            "item-1",
            "up-1",
            UploadEventPayload::Completed {
                url: "https://cdn.example.com/a.jpg".to_string(),
            },
        )
        .unwrap();

        let event1 = rx1.recv().await.unwrap();
        let event2 = rx2.recv().await.unwrap();
        assert_eq!(event1.sequence, event2.sequence);
        assert_eq!(event1.payload, event2.payload);
    }

    #[test]
    fn test_publish_without_subscribers_fails_but_advances_sequence() {
        let bus = EventBus::default();
        assert!(bus.publish("item-1", "up-1", UploadEventPayload::Removed).is_err());
        assert_eq!(bus.current_sequence(), 2);

        let _rx = bus.subscribe();
        assert_eq!(
            bus.publish("item-1", "up-1", UploadEventPayload::Removed).unwrap(),
            2
        );
        assert_eq!(bus.receiver_count(), 1);
    }

    #[test]
    fn test_payload_serializes_with_type_tag() {
        let json = serde_json::to_value(UploadEventPayload::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["error"], "boom");
    }
}
