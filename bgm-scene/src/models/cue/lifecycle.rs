//! Cue lifecycle transitions
//!
//! Every request sent for a cue carries a ticket with the cue's sequence
//! number at the time of sending. A response is applied only when its
//! ticket is still the cue's latest; anything older is stale and dropped.

use super::Cue;
use crate::models::payload::AudioPayload;
use bgm_common::events::CueState;
use thiserror::Error;
use uuid::Uuid;

/// Identifies one generation or regeneration request for one cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub cue_id: Uuid,
    pub seq: u64,
}

/// A state change, reported so callers can emit events after the lock drops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub cue_id: Uuid,
    pub from: CueState,
    pub to: CueState,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Result of a generation request as seen by one cue
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Audio arrived; `duration_ms` is the measured length when reported
    Audio {
        payload: AudioPayload,
        duration_ms: Option<u64>,
    },
    /// Call succeeded but carried no audio for this cue
    Empty,
    /// Call errored
    TransportFailed(String),
}

/// What happened when a response was offered to a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(Transition),
    /// Ticket was superseded; cue unchanged
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {action} cue {cue_id} in state {from}")]
    InvalidTransition {
        cue_id: Uuid,
        from: CueState,
        action: &'static str,
    },
}

impl Cue {
    /// Latest issued request sequence number (0 before any request)
    pub fn request_seq(&self) -> u64 {
        self.request_seq
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        self.request_seq += 1;
        RequestTicket {
            cue_id: self.id,
            seq: self.request_seq,
        }
    }

    /// Pending → Generating, as part of a batch
    pub fn begin_generation(&mut self) -> Result<(RequestTicket, Transition), LifecycleError> {
        if self.state != CueState::Pending {
            return Err(LifecycleError::InvalidTransition {
                cue_id: self.id,
                from: self.state,
                action: "generate",
            });
        }
        let ticket = self.issue_ticket();
        let transition = self.move_to(CueState::Generating);
        Ok((ticket, transition))
    }

    /// Request replacement audio for this cue alone
    ///
    /// A cue holding audio keeps it while the request is in flight
    /// (`Regenerating`); a cue without audio goes to `Generating`. Issuing
    /// a new ticket makes any earlier in-flight response stale.
    pub fn begin_regeneration(&mut self) -> (RequestTicket, Transition) {
        let ticket = self.issue_ticket();
        let next = if self.payload.is_some() {
            CueState::Regenerating
        } else {
            CueState::Generating
        };
        let transition = self.move_to(next);
        (ticket, transition)
    }

    /// Apply a response to this cue if `ticket` is still current
    pub fn complete(&mut self, ticket: RequestTicket, outcome: GenerationOutcome) -> ApplyOutcome {
        if ticket.cue_id != self.id || ticket.seq != self.request_seq || !self.state.is_in_flight() {
            return ApplyOutcome::Stale;
        }

        let transition = match outcome {
            GenerationOutcome::Audio {
                payload,
                duration_ms,
            } => {
                if let Some(measured) = duration_ms.filter(|ms| *ms > 0) {
                    self.duration_ms = measured;
                    if let super::CueContent::Sound { mix, .. } = &mut self.content {
                        mix.fit_to_duration(measured);
                    }
                }
                self.payload = Some(payload);
                self.last_error = None;
                self.move_to(CueState::Ready)
            }
            GenerationOutcome::Empty => self.fail("no audio returned".to_string()),
            GenerationOutcome::TransportFailed(message) => self.fail(message),
        };
        ApplyOutcome::Applied(transition)
    }

    fn fail(&mut self, reason: String) -> Transition {
        self.payload = None;
        self.last_error = Some(reason);
        self.move_to(CueState::Failed)
    }

    fn move_to(&mut self, to: CueState) -> Transition {
        let from = self.state;
        self.state = to;
        debug_assert_eq!(self.payload.is_some(), to.has_payload());
        Transition {
            cue_id: self.id,
            from,
            to,
        }
    }
}
