//! Domain events for requests and payments, and the broadcast bus that
//! carries them to the notification dispatcher.

use chrono::{DateTime, Utc};
use helphub_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event type names
// ---------------------------------------------------------------------------

pub const REQUEST_CREATED: &str = "request.created";
pub const REQUEST_STATUS_CHANGED: &str = "request.status_changed";
pub const REQUEST_CANCELLED: &str = "request.cancelled";
pub const REQUEST_COMPLETED_BY_HELPER: &str = "request.completed_by_helper";
pub const REQUEST_COMPLETION_CONFIRMED: &str = "request.completion_confirmed";
pub const REQUEST_DISPUTE_RAISED: &str = "request.dispute_raised";
pub const PAYMENT_HELD: &str = "payment.held";
pub const PAYMENT_RELEASED: &str = "payment.released";
pub const PAYMENT_REFUNDED: &str = "payment.refunded";

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something that happened to a request or payment.
///
/// Constructed via [`DomainEvent::new`] and enriched with the builder
/// methods [`for_request`](DomainEvent::for_request),
/// [`with_actor`](DomainEvent::with_actor),
/// [`notify`](DomainEvent::notify), [`notify_admin`](DomainEvent::notify_admin)
/// and [`with_payload`](DomainEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"request.cancelled"`.
    pub event_type: String,

    /// The service request the event concerns, if any.
    pub request_id: Option<DbId>,

    /// The user that triggered the event.
    pub actor_id: Option<DbId>,

    /// Users that should be told about the event.
    pub recipient_ids: Vec<DbId>,

    /// Whether the platform admin address should be told as well.
    pub admin_recipient: bool,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            request_id: None,
            actor_id: None,
            recipient_ids: Vec::new(),
            admin_recipient: false,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the service request the event concerns.
    pub fn for_request(mut self, request_id: DbId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Attach the acting user.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_id = Some(user_id);
        self
    }

    /// Add a recipient. `None` (an anonymous submitter) and duplicates are
    /// ignored.
    pub fn notify(mut self, user_id: Option<DbId>) -> Self {
        if let Some(id) = user_id {
            if !self.recipient_ids.contains(&id) {
                self.recipient_ids.push(id);
            }
        }
        self
    }

    /// Copy the platform admin address.
    pub fn notify_admin(mut self) -> Self {
        self.admin_recipient = true;
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Whether anyone at all should be emailed.
    pub fn has_recipients(&self) -> bool {
        self.admin_recipient || !self.recipient_ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Events buffered per subscriber before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of [`DomainEvent`]s to in-process subscribers.
///
/// A subscriber that falls more than the channel capacity behind sees
/// `RecvError::Lagged` and skips ahead.
///
/// ```rust
/// use helphub_events::bus::{DomainEvent, EventBus, REQUEST_CREATED};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// assert_eq!(bus.publish(DomainEvent::new(REQUEST_CREATED).for_request(1)), 1);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Hand `event` to every live subscriber and return how many got it.
    ///
    /// Publishing never fails; with no subscriber the event is dropped.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let event_type = event.event_type.clone();
        let request_id = event.request_id;
        match self.sender.send(event) {
            Ok(delivered) => {
                tracing::debug!(%event_type, ?request_id, delivered, "Domain event published");
                delivered
            }
            Err(_) => {
                tracing::debug!(%event_type, ?request_id, "Domain event dropped: no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
