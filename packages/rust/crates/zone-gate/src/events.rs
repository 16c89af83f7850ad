//! Transition event bus.
//!
//! Every committed transition is published as a [`GatingEvent`] on a
//! `tokio::sync::broadcast` channel so analytics and UI shells can follow the
//! flow without polling the state.
//!
//! ```text
//! Orchestrator commit(prev -> next)
//!      ↓
//! GatingEventBus.publish() → broadcast::Sender
//!      ↓
//! Fan-out to every subscriber
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::{GatingState, GatingStatus};

/// One committed transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingEvent {
    /// Unique event identifier.
    pub id: String,
    /// Event topic (see [`topics`]).
    pub topic: String,
    /// Status before the commit.
    pub from: GatingStatus,
    /// Status after the commit.
    pub to: GatingStatus,
    /// Flexible JSON payload.
    pub payload: Value,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
}

impl GatingEvent {
    /// Create a new event.
    pub fn new(
        topic: impl Into<String>,
        from: GatingStatus,
        to: GatingStatus,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            from,
            to,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Event describing the commit from `previous` to `next`.
    pub fn transition(previous: &GatingState, next: &GatingState) -> Self {
        let topic = match next.status {
            GatingStatus::Completed | GatingStatus::ViewingModeReady => topics::COMPLETED,
            GatingStatus::Failed | GatingStatus::GpsDisabled => topics::FAILED,
            _ => topics::TRANSITION,
        };
        Self::new(
            topic,
            previous.status,
            next.status,
            json!({
                "access_level": next.access_level,
                "is_loading": next.is_loading,
                "has_completed_in_session": next.has_completed_in_session,
                "error_message": next.error_message,
            }),
        )
    }
}

impl std::fmt::Display for GatingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {} -> {}",
            self.timestamp.format("%H:%M:%S"),
            self.topic,
            self.from,
            self.to
        )
    }
}

/// Broadcast bus for gating events.
#[derive(Clone)]
pub struct GatingEventBus {
    tx: broadcast::Sender<GatingEvent>,
}

impl GatingEventBus {
    /// Create a new event bus with specified capacity (at least one slot).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers who received the event.
    /// Returns 0 if there are no subscribers (not an error).
    pub fn publish(&self, event: GatingEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to future events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<GatingEvent> {
        self.tx.subscribe()
    }
}

/// Event topic constants.
pub mod topics {
    /// Intermediate transition.
    pub const TRANSITION: &str = "gating/transition";
    /// Entry granted (full or viewing).
    pub const COMPLETED: &str = "gating/completed";
    /// Recoverable failure.
    pub const FAILED: &str = "gating/failed";
    /// Session state returned to defaults.
    pub const RESET: &str = "gating/reset";
}
