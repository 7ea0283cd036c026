//! Lifecycle event system for the pacing engine
//!
//! One-to-many broadcasting over `tokio::sync::broadcast`: the engine emits,
//! any number of host subscribers receive. Emission never blocks the pacing
//! cycle; with no subscribers events are dropped (`emit_lossy`) or reported
//! as an error result (`emit`) depending on the call site's needs.
//!
//! `ready`, `almost-finished`, and `finish` fire at most once per attached
//! source lifetime; `pause` fires on every toggle; `dispatch-error` fires
//! once per failed sink delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle events emitted by the pacing engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PacerEvent {
    /// Enough media is buffered to begin live delivery
    ReadyToPlay { timestamp: DateTime<Utc> },

    /// The paused bit was toggled
    PauseToggled {
        paused: bool,
        timestamp: DateTime<Utc>,
    },

    /// The source has exhausted and the buffered remainder is nearly drained
    AlmostFinished { timestamp: DateTime<Utc> },

    /// Delivery is complete (buffer drained after exhaustion, or `stop()`)
    Finished { timestamp: DateTime<Utc> },

    /// A sink delivery failed; the pacing loop continues
    DispatchError {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl PacerEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PacerEvent::ReadyToPlay { .. } => "ReadyToPlay",
            PacerEvent::PauseToggled { .. } => "PauseToggled",
            PacerEvent::AlmostFinished { .. } => "AlmostFinished",
            PacerEvent::Finished { .. } => "Finished",
            PacerEvent::DispatchError { .. } => "DispatchError",
        }
    }
}

/// Broadcast event bus for [`PacerEvent`]
///
/// Cloneable handle; all clones share one channel. Subscribers that fall
/// behind by more than the channel capacity observe `RecvError::Lagged`
/// rather than blocking the engine.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PacerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PacerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or an error when nobody is listening.
    pub fn emit(&self, event: PacerEvent) -> Result<usize, broadcast::error::SendError<PacerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, silently dropping it when there are no subscribers
    ///
    /// The pacing cycle uses this form: delivery must proceed whether or not
    /// the host is watching lifecycle events.
    pub fn emit_lossy(&self, event: PacerEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
