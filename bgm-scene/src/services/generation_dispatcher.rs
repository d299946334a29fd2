//! Generation Dispatcher
//!
//! Sends every `Pending` cue to the collaborator in one batched call and
//! demultiplexes the response back onto cues by id. Single-cue regeneration
//! shares the same attachment path.
//!
//! The scene lock is held only to move cues into flight and to apply
//! results, never across the collaborator call. Results are applied by
//! ticket, so a response for a cue that was replaced, re-requested, or
//! belongs to an older scene is dropped without touching the registry.

use super::scene_backend::{
    BatchGenerationRequest, BatchGenerationResponse, RegenerationRequest, SceneBackend,
    WireAudioResult, WireCue,
};
use crate::error::SceneError;
use crate::models::{
    ApplyOutcome, AudioPayload, CueContent, CuePatch, GenerationOutcome, RequestTicket,
    SceneHandle, Transition,
};
use bgm_common::events::{BgmEvent, CueState, EventBus};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tally of one batched generation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub session_id: Uuid,
    /// Cues sent in the batch
    pub requested: usize,
    pub ready: usize,
    pub failed: usize,
    /// Results dropped because their ticket was no longer current
    pub stale: usize,
    /// Set when the whole call failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_error: Option<String>,
}

/// How a single-cue regeneration ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegenerationReport {
    pub cue_id: Uuid,
    /// False when a newer request or scene superseded this one
    pub applied: bool,
    /// State the cue is in now; `None` when the cue no longer exists
    pub state: Option<CueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decode one collaborator result into a cue outcome
///
/// A missing, blank or zero-length payload is an empty result, which fails
/// the cue just like a transport error.
pub fn outcome_from_audio(audio_base64: Option<&str>, duration_ms: Option<u64>) -> GenerationOutcome {
    let encoded = match audio_base64.map(str::trim) {
        Some(encoded) if !encoded.is_empty() => encoded,
        _ => return GenerationOutcome::Empty,
    };
    match AudioPayload::from_base64(encoded) {
        Ok(payload) if payload.is_empty() => GenerationOutcome::Empty,
        Ok(payload) => GenerationOutcome::Audio {
            payload,
            duration_ms,
        },
        Err(e) => GenerationOutcome::TransportFailed(format!("undecodable audio payload: {}", e)),
    }
}

fn rank(result: &WireAudioResult) -> (bool, u64, &str) {
    let audio = result.audio_base64.as_deref().unwrap_or("").trim();
    (!audio.is_empty(), result.duration_ms.unwrap_or(0), audio)
}

/// Index batch results by cue id
///
/// Entries whose id is not a cue id are ignored. When the collaborator
/// answers the same id more than once, the entry with audio wins, then the
/// longer one; the choice does not depend on response order.
pub fn demultiplex(response: BatchGenerationResponse) -> HashMap<Uuid, WireAudioResult> {
    let mut by_id: HashMap<Uuid, WireAudioResult> = HashMap::new();
    for result in response.audio_cues {
        let id = match Uuid::parse_str(result.audio_cue.id.trim()) {
            Ok(id) => id,
            Err(_) => {
                debug!(id = %result.audio_cue.id, "Ignoring result with foreign cue id");
                continue;
            }
        };
        match by_id.get(&id) {
            Some(existing) if rank(existing) >= rank(&result) => {
                warn!(cue_id = %id, "Duplicate result for cue ignored");
            }
            _ => {
                by_id.insert(id, result);
            }
        }
    }
    by_id
}

pub struct GenerationDispatcher {
    backend: Arc<dyn SceneBackend>,
    event_bus: EventBus,
}

impl GenerationDispatcher {
    pub fn new(backend: Arc<dyn SceneBackend>, event_bus: EventBus) -> Self {
        Self { backend, event_bus }
    }

    /// Generate audio for every `Pending` cue in one collaborator call
    ///
    /// `total_duration_hint_ms` overrides the decomposition's duration hint.
    /// Per-cue failures never affect sibling cues; a transport failure fails
    /// every cue in this batch. Nothing is retried.
    pub async fn dispatch_pending(
        &self,
        scene: &SceneHandle,
        total_duration_hint_ms: Option<u64>,
    ) -> Result<BatchSummary, SceneError> {
        // Move Pending cues into flight and snapshot them for the request
        let (session_id, tickets, request) = {
            let mut guard = scene.write().await;
            let state = guard.as_mut().ok_or(SceneError::NoScene)?;
            let total_duration_ms = total_duration_hint_ms.unwrap_or(state.duration_hint_ms);

            let mut tickets = Vec::new();
            let mut cues = Vec::new();
            let mut transitions = Vec::new();
            for id in state.registry.pending_ids() {
                let started = state.registry.update_with(id, |cue| {
                    cue.begin_generation()
                        .map(|(ticket, transition)| (ticket, transition, WireCue::from(&*cue)))
                });
                match started {
                    Some(Ok((ticket, transition, wire))) => {
                        tickets.push(ticket);
                        cues.push(wire);
                        transitions.push(transition);
                    }
                    Some(Err(e)) => debug!(cue_id = %id, error = %e, "Cue skipped from batch"),
                    None => {}
                }
            }

            self.emit_transitions(state.session_id, &transitions);
            (
                state.session_id,
                tickets,
                BatchGenerationRequest {
                    cues,
                    total_duration_ms,
                },
            )
        };

        let mut summary = BatchSummary {
            session_id,
            requested: tickets.len(),
            ..Default::default()
        };
        if tickets.is_empty() {
            debug!(session_id = %session_id, "No pending cues to generate");
            return Ok(summary);
        }

        info!(
            session_id = %session_id,
            cues = tickets.len(),
            total_duration_ms = request.total_duration_ms,
            "Dispatching batch generation"
        );

        let mut outcomes: HashMap<Uuid, GenerationOutcome> = match self
            .backend
            .generate_batch(&request)
            .await
        {
            Ok(response) => demultiplex(response)
                .into_iter()
                .map(|(id, result)| {
                    (
                        id,
                        outcome_from_audio(result.audio_base64.as_deref(), result.duration_ms),
                    )
                })
                .collect(),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Batch generation failed");
                let message = e.to_string();
                summary.transport_error = Some(message.clone());
                tickets
                    .iter()
                    .map(|t| (t.cue_id, GenerationOutcome::TransportFailed(message.clone())))
                    .collect()
            }
        };

        let transitions = {
            let mut guard = scene.write().await;
            match guard.as_mut() {
                Some(state) if state.session_id == session_id => {
                    let mut transitions = Vec::new();
                    for ticket in &tickets {
                        let outcome = outcomes
                            .remove(&ticket.cue_id)
                            .unwrap_or(GenerationOutcome::Empty);
                        match state.registry.update_with(ticket.cue_id, |cue| {
                            cue.complete(*ticket, outcome)
                        }) {
                            Some(ApplyOutcome::Applied(transition)) => {
                                match transition.to {
                                    CueState::Ready => summary.ready += 1,
                                    _ => summary.failed += 1,
                                }
                                transitions.push(transition);
                            }
                            Some(ApplyOutcome::Stale) | None => summary.stale += 1,
                        }
                    }
                    transitions
                }
                _ => {
                    debug!(session_id = %session_id, "Scene replaced, dropping batch results");
                    summary.stale = tickets.len();
                    Vec::new()
                }
            }
        };

        self.emit_transitions(session_id, &transitions);
        self.event_bus.emit_lossy(BgmEvent::BatchGenerationCompleted {
            session_id,
            ready: summary.ready,
            failed: summary.failed,
            stale: summary.stale,
            timestamp: Utc::now(),
        });

        info!(
            session_id = %session_id,
            ready = summary.ready,
            failed = summary.failed,
            stale = summary.stale,
            "Batch generation applied"
        );
        Ok(summary)
    }

    /// Request new audio for one cue
    ///
    /// `prompt_override` replaces the prompt (or narration text) before the
    /// request is built. Only the latest request for a cue is applied.
    pub async fn regenerate(
        &self,
        scene: &SceneHandle,
        cue_id: Uuid,
        prompt_override: Option<String>,
    ) -> Result<RegenerationReport, SceneError> {
        let (session_id, ticket, request) = {
            let mut guard = scene.write().await;
            let state = guard.as_mut().ok_or(SceneError::NoScene)?;
            let cue = state
                .registry
                .get(cue_id)
                .ok_or(SceneError::CueNotFound(cue_id))?;

            if let Some(text) = prompt_override {
                let patch = match cue.content() {
                    CueContent::Sound { .. } => CuePatch {
                        prompt_text: Some(text),
                        ..Default::default()
                    },
                    CueContent::Narration { .. } => CuePatch {
                        story: Some(text),
                        ..Default::default()
                    },
                };
                state.registry.update(cue_id, &patch)?;
            }

            let (ticket, transition, wire) = state
                .registry
                .update_with(cue_id, |cue| {
                    let (ticket, transition) = cue.begin_regeneration();
                    (ticket, transition, WireCue::from(&*cue))
                })
                .ok_or(SceneError::CueNotFound(cue_id))?;

            self.emit_transitions(state.session_id, &[transition]);
            (
                state.session_id,
                ticket,
                RegenerationRequest { cue: wire },
            )
        };

        info!(cue_id = %cue_id, seq = ticket.seq, "Regenerating cue");

        let outcome = match self.backend.regenerate(&request).await {
            Ok(response) => outcome_from_audio(response.audio_base64.as_deref(), response.duration_ms),
            Err(e) => {
                warn!(cue_id = %cue_id, error = %e, "Regeneration failed");
                GenerationOutcome::TransportFailed(e.to_string())
            }
        };

        let (applied, report) = self.apply_single(scene, session_id, ticket, outcome).await;
        if let Some(transition) = applied {
            self.emit_transitions(session_id, &[transition]);
            self.event_bus.emit_lossy(BgmEvent::CueRegenerated {
                session_id,
                cue_id,
                success: transition.to == CueState::Ready,
                timestamp: Utc::now(),
            });
        } else {
            debug!(cue_id = %cue_id, seq = ticket.seq, "Stale regeneration result dropped");
        }
        Ok(report)
    }

    async fn apply_single(
        &self,
        scene: &SceneHandle,
        session_id: Uuid,
        ticket: RequestTicket,
        outcome: GenerationOutcome,
    ) -> (Option<Transition>, RegenerationReport) {
        let mut guard = scene.write().await;
        let current = guard
            .as_mut()
            .filter(|state| state.session_id == session_id)
            .and_then(|state| {
                state.registry.update_with(ticket.cue_id, |cue| {
                    let applied = cue.complete(ticket, outcome);
                    (applied, cue.state(), cue.last_error().map(str::to_string))
                })
            });

        match current {
            Some((ApplyOutcome::Applied(transition), state, error)) => (
                Some(transition),
                RegenerationReport {
                    cue_id: ticket.cue_id,
                    applied: true,
                    state: Some(state),
                    error,
                },
            ),
            Some((ApplyOutcome::Stale, state, _)) => (
                None,
                RegenerationReport {
                    cue_id: ticket.cue_id,
                    applied: false,
                    state: Some(state),
                    error: None,
                },
            ),
            None => (
                None,
                RegenerationReport {
                    cue_id: ticket.cue_id,
                    applied: false,
                    state: None,
                    error: Some(SceneError::SceneReplaced.to_string()),
                },
            ),
        }
    }

    fn emit_transitions(&self, session_id: Uuid, transitions: &[Transition]) {
        for transition in transitions.iter().filter(|t| t.is_change()) {
            self.event_bus.emit_lossy(BgmEvent::CueStateChanged {
                session_id,
                cue_id: transition.cue_id,
                old_state: transition.from,
                new_state: transition.to,
                timestamp: Utc::now(),
            });
        }
    }
}
