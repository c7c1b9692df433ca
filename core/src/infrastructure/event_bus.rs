// Event Bus Implementation - Pub/Sub for Domain Events
//
// Provides in-memory event streaming using tokio broadcast channels. The
// notification delivery collaborator and reporting observers subscribe here;
// every workflow transition and ledger merge publishes through this bus.
//
// In-memory only: events are lost on restart. Durable state lives in the
// repositories, so a restart only drops undelivered notifications.

use crate::domain::employee::EmployeeId;
use crate::domain::events::{LedgerEvent, Notification, RequestEvent, SubmissionEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Ledger(LedgerEvent),
    Submission(SubmissionEvent),
    Request(RequestEvent),
    Notification(Notification),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Capacity determines how many events can be buffered before dropping
    /// old ones.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_ledger_event(&self, event: LedgerEvent) {
        self.publish(DomainEvent::Ledger(event));
    }

    pub fn publish_submission_event(&self, event: SubmissionEvent) {
        self.publish(DomainEvent::Submission(event));
    }

    pub fn publish_request_event(&self, event: RequestEvent) {
        self.publish(DomainEvent::Request(event));
    }

    pub fn publish_notification(&self, notification: Notification) {
        self.publish(DomainEvent::Notification(notification));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        let receiver = self.sender.subscribe();
        EventReceiver { receiver }
    }

    /// Subscribe to the notifications addressed to one user. This is the
    /// feed the external delivery collaborator consumes per recipient.
    pub fn subscribe_notifications(&self, user_id: EmployeeId) -> NotificationReceiver {
        let receiver = self.sender.subscribe();
        NotificationReceiver { receiver, user_id }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (blocks until event is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one user's notifications (filtered)
pub struct NotificationReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    user_id: EmployeeId,
}

impl NotificationReceiver {
    /// Receive the next notification addressed to this receiver's user,
    /// skipping everything else on the bus.
    pub async fn recv(&mut self) -> Result<Notification, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;

            if let DomainEvent::Notification(notification) = event {
                if notification.user_id == self.user_id {
                    return Ok(notification);
                }
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::NotificationKind;
    use crate::domain::submission::SubmissionId;
    use chrono::Utc;

    fn notification(user: &str, kind: NotificationKind) -> Notification {
        Notification {
            user_id: EmployeeId::new(user),
            kind,
            title: "Monthly report".to_string(),
            message: "status changed".to_string(),
            related_entity_id: SubmissionId::new().to_string(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish_submission_event(SubmissionEvent::SubmissionCreated {
            submission_id: SubmissionId::new(),
            mentee_id: EmployeeId::new("emp1"),
            month: crate::domain::calendar::MonthKey::parse("2024-03").unwrap(),
            created_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        match received {
            DomainEvent::Submission(SubmissionEvent::SubmissionCreated { mentee_id, .. }) => {
                assert_eq!(mentee_id, EmployeeId::new("emp1"));
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_notification_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_notifications(EmployeeId::new("emp1"));

        // Notification for a different user (should be filtered out)
        event_bus.publish_notification(notification("emp2", NotificationKind::SubmissionApproved));
        // Notification for our user (should be received)
        event_bus.publish_notification(notification("emp1", NotificationKind::SubmissionRejected));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.user_id, EmployeeId::new("emp1"));
        assert_eq!(received.kind, NotificationKind::SubmissionRejected);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish_notification(notification("emp1", NotificationKind::RequestApproved));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }
}
