//! Event types for the BGM event system
//!
//! Provides shared event definitions and the EventBus used to fan scene
//! progress out to SSE subscribers.

mod scene_types;

pub use scene_types::{CueState, EvaluationTarget};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// BGM event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BgmEvent {
    /// A decomposition replaced the cue registry
    SceneDecomposed {
        /// New scene session identifier
        session_id: Uuid,
        /// Number of cues created
        cue_count: usize,
        /// Duration hint returned by the decomposition collaborator
        total_duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// One cue moved between lifecycle states
    CueStateChanged {
        session_id: Uuid,
        cue_id: Uuid,
        old_state: CueState,
        new_state: CueState,
        timestamp: DateTime<Utc>,
    },

    /// A batched generation call resolved
    BatchGenerationCompleted {
        session_id: Uuid,
        /// Cues that received audio
        ready: usize,
        /// Cues that failed (transport failure or empty result)
        failed: usize,
        /// Results dropped because their cue was no longer current
        stale: usize,
        timestamp: DateTime<Utc>,
    },

    /// A single-cue regeneration resolved and was applied
    CueRegenerated {
        session_id: Uuid,
        cue_id: Uuid,
        /// Whether new audio was attached
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// A new master artifact replaced the previous one
    MasterMixCompleted {
        session_id: Uuid,
        artifact_id: Uuid,
        /// Cues included in the mix
        cue_count: usize,
        total_duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A mix call failed; the previous artifact is unchanged
    MasterMixFailed {
        session_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer submitted an evaluation
    EvaluationSubmitted {
        session_id: Uuid,
        evaluation_id: Uuid,
        target: EvaluationTarget,
        timestamp: DateTime<Utc>,
    },
}

impl BgmEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            BgmEvent::SceneDecomposed { .. } => "SceneDecomposed",
            BgmEvent::CueStateChanged { .. } => "CueStateChanged",
            BgmEvent::BatchGenerationCompleted { .. } => "BatchGenerationCompleted",
            BgmEvent::CueRegenerated { .. } => "CueRegenerated",
            BgmEvent::MasterMixCompleted { .. } => "MasterMixCompleted",
            BgmEvent::MasterMixFailed { .. } => "MasterMixFailed",
            BgmEvent::EvaluationSubmitted { .. } => "EvaluationSubmitted",
        }
    }

    /// Scene session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            BgmEvent::SceneDecomposed { session_id, .. }
            | BgmEvent::CueStateChanged { session_id, .. }
            | BgmEvent::BatchGenerationCompleted { session_id, .. }
            | BgmEvent::CueRegenerated { session_id, .. }
            | BgmEvent::MasterMixCompleted { session_id, .. }
            | BgmEvent::MasterMixFailed { session_id, .. }
            | BgmEvent::EvaluationSubmitted { session_id, .. } => *session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use bgm_common::events::{BgmEvent, EventBus};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(BgmEvent::MasterMixFailed {
///     session_id: Uuid::new_v4(),
///     error: "backend unreachable".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BgmEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BgmEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: BgmEvent) -> Result<usize, broadcast::error::SendError<BgmEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BgmEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_change(session_id: Uuid) -> BgmEvent {
        BgmEvent::CueStateChanged {
            session_id,
            cue_id: Uuid::new_v4(),
            old_state: CueState::Pending,
            new_state: CueState::Generating,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(state_change(Uuid::new_v4())).is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();

        assert_eq!(bus.emit(state_change(session_id)).unwrap(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "CueStateChanged");
        assert_eq!(event.session_id(), session_id);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = state_change(Uuid::new_v4());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CueStateChanged");
        assert_eq!(json["old_state"], "Pending");
        assert_eq!(json["new_state"], "Generating");
    }

    #[test]
    fn test_evaluation_target_serialization() {
        let cue_id = Uuid::new_v4();
        let json = serde_json::to_value(EvaluationTarget::Cue { cue_id }).unwrap();
        assert_eq!(json["kind"], "cue");
        assert_eq!(json["cue_id"], cue_id.to_string());
    }

    #[test]
    fn test_cue_state_payload_rules() {
        assert!(CueState::Ready.has_payload());
        assert!(CueState::Regenerating.has_payload());
        assert!(!CueState::Pending.has_payload());
        assert!(!CueState::Generating.has_payload());
        assert!(!CueState::Failed.has_payload());

        assert!(CueState::Generating.is_in_flight());
        assert!(CueState::Regenerating.is_in_flight());
        assert!(!CueState::Ready.is_in_flight());
    }

    #[test]
    fn test_capacity() {
        let bus = EventBus::new(42);
        assert_eq!(bus.capacity(), 42);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
