//! Shared test helpers: a scripted in-memory collaborator
//!
//! Cue ids are minted by the service, so scripts address cues by their
//! prompt text (`audio_class`, or `story` for narration).

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bgm_common::events::EventBus;
use bgm_scene::models::AutomatedMetrics;
use bgm_scene::services::scene_backend::{
    BatchGenerationRequest, BatchGenerationResponse, DecomposeRequest, DecomposeResponse,
    EvaluateRequest, MixRequest, MixResponse, RegenerationRequest, RegenerationResponse,
    WireAudioResult,
};
use bgm_scene::services::{BackendError, RecordSink, RecordSubmission, SceneBackend, WireCue};
use bgm_scene::AppState;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

pub fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decomposition entry for a sound cue
pub fn sound(id: i64, kind: &str, prompt: &str, start_ms: u64, duration_ms: u64) -> WireCue {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "audio_type": kind,
        "audio_class": prompt,
        "start_time_ms": start_ms,
        "duration_ms": duration_ms,
        "weight_db": 0.0,
        "fade_ms": 500,
    }))
    .unwrap()
}

/// Decomposition entry for a narrator cue
pub fn narration(id: i64, story: &str, start_ms: u64, duration_ms: u64) -> WireCue {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "audio_type": "NARRATOR",
        "story": story,
        "narrator_description": "warm, unhurried",
        "start_time_ms": start_ms,
        "duration_ms": duration_ms,
    }))
    .unwrap()
}

/// Text a wire cue is addressed by in scripts
pub fn prompt_of(cue: &WireCue) -> String {
    cue.audio_class
        .clone()
        .or_else(|| cue.story.clone())
        .unwrap_or_default()
}

/// Behaviour of the next batched generation call
#[derive(Default)]
pub struct BatchScript {
    /// Prompts left out of the response entirely
    pub drop: HashSet<String>,
    /// Prompts answered without audio
    pub empty: HashSet<String>,
    /// Reported durations by prompt
    pub durations: HashMap<String, u64>,
    /// Fail the whole call
    pub transport_error: Option<BackendError>,
    /// Shuffle the response entries
    pub shuffle: bool,
    /// Hold the response until notified
    pub gate: Option<Arc<Notify>>,
}

/// Behaviour of one regeneration call
pub struct RegenScript {
    pub audio: Option<Vec<u8>>,
    pub duration_ms: Option<u64>,
    pub error: Option<BackendError>,
    pub gate: Option<Arc<Notify>>,
}

impl RegenScript {
    pub fn audio(bytes: &[u8]) -> Self {
        Self {
            audio: Some(bytes.to_vec()),
            duration_ms: None,
            error: None,
            gate: None,
        }
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            audio: None,
            duration_ms: None,
            error: Some(error),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Scripted collaborator that records every request it receives
pub struct ScriptedBackend {
    pub decomposition: Mutex<Vec<WireCue>>,
    pub duration_hint_ms: Mutex<u64>,
    pub decompose_error: Mutex<Option<BackendError>>,
    pub batch: Mutex<BatchScript>,
    pub regenerations: Mutex<VecDeque<RegenScript>>,
    pub mix_error: Mutex<Option<BackendError>>,
    pub mix_gate: Mutex<Option<Arc<Notify>>>,
    pub healthy: Mutex<bool>,

    pub batch_requests: Mutex<Vec<BatchGenerationRequest>>,
    pub regen_requests: Mutex<Vec<RegenerationRequest>>,
    pub mix_requests: Mutex<Vec<MixRequest>>,
    pub evaluate_requests: Mutex<Vec<EvaluateRequest>>,
}

impl ScriptedBackend {
    pub fn new(cues: Vec<WireCue>) -> Arc<Self> {
        let hint = cues
            .iter()
            .map(|c| c.start_time_ms + c.duration_ms)
            .max()
            .unwrap_or(0);
        Arc::new(Self {
            decomposition: Mutex::new(cues),
            duration_hint_ms: Mutex::new(hint),
            decompose_error: Mutex::new(None),
            batch: Mutex::new(BatchScript::default()),
            regenerations: Mutex::new(VecDeque::new()),
            mix_error: Mutex::new(None),
            mix_gate: Mutex::new(None),
            healthy: Mutex::new(true),
            batch_requests: Mutex::new(Vec::new()),
            regen_requests: Mutex::new(Vec::new()),
            mix_requests: Mutex::new(Vec::new()),
            evaluate_requests: Mutex::new(Vec::new()),
        })
    }

    /// Three SFX cues "A", "B", "C", one second apart
    pub fn abc() -> Arc<Self> {
        Self::new(vec![
            sound(1, "SFX", "A", 0, 1000),
            sound(2, "SFX", "B", 1000, 1000),
            sound(3, "SFX", "C", 2000, 1000),
        ])
    }

    pub fn script_batch(&self, script: BatchScript) {
        *self.batch.lock().unwrap() = script;
    }

    pub fn push_regeneration(&self, script: RegenScript) {
        self.regenerations.lock().unwrap().push_back(script);
    }

    pub fn fail_mix(&self, error: Option<BackendError>) {
        *self.mix_error.lock().unwrap() = error;
    }

    /// Hold every mix response until `gate` is notified
    pub fn gate_mix(&self, gate: Arc<Notify>) {
        *self.mix_gate.lock().unwrap() = Some(gate);
    }

    pub fn mix_calls(&self) -> usize {
        self.mix_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SceneBackend for ScriptedBackend {
    async fn decompose(
        &self,
        _request: &DecomposeRequest,
    ) -> Result<DecomposeResponse, BackendError> {
        if let Some(error) = self.decompose_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(DecomposeResponse {
            cues: self.decomposition.lock().unwrap().clone(),
            total_duration_ms: *self.duration_hint_ms.lock().unwrap(),
            message: "ok".to_string(),
        })
    }

    async fn generate_batch(
        &self,
        request: &BatchGenerationRequest,
    ) -> Result<BatchGenerationResponse, BackendError> {
        self.batch_requests.lock().unwrap().push(request.clone());

        let gate = self.batch.lock().unwrap().gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let script = self.batch.lock().unwrap();
        if let Some(error) = script.transport_error.clone() {
            return Err(error);
        }

        let mut audio_cues: Vec<WireAudioResult> = request
            .cues
            .iter()
            .filter(|cue| !script.drop.contains(&prompt_of(cue)))
            .map(|cue| {
                let prompt = prompt_of(cue);
                let audio_base64 = if script.empty.contains(&prompt) {
                    None
                } else {
                    Some(b64(format!("audio:{}", prompt).as_bytes()))
                };
                WireAudioResult {
                    audio_cue: cue.clone(),
                    audio_base64,
                    duration_ms: script.durations.get(&prompt).copied(),
                }
            })
            .collect();

        if script.shuffle {
            audio_cues.shuffle(&mut rand::thread_rng());
        }

        Ok(BatchGenerationResponse {
            audio_cues,
            message: "ok".to_string(),
        })
    }

    async fn regenerate(
        &self,
        request: &RegenerationRequest,
    ) -> Result<RegenerationResponse, BackendError> {
        self.regen_requests.lock().unwrap().push(request.clone());

        let script = self
            .regenerations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RegenScript::audio(b"regenerated"));

        if let Some(gate) = &script.gate {
            gate.notified().await;
        }
        if let Some(error) = script.error {
            return Err(error);
        }
        Ok(RegenerationResponse {
            audio_base64: script.audio.as_deref().map(b64),
            duration_ms: script.duration_ms,
        })
    }

    async fn mix(&self, request: &MixRequest) -> Result<MixResponse, BackendError> {
        self.mix_requests.lock().unwrap().push(request.clone());

        let gate = self.mix_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.mix_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(MixResponse {
            audio_base64: b64(format!("master:{}", request.cues.len()).as_bytes()),
            total_duration_ms: Some(request.total_duration_ms),
            message: "ok".to_string(),
        })
    }

    async fn evaluate(&self, request: &EvaluateRequest) -> Result<AutomatedMetrics, BackendError> {
        self.evaluate_requests.lock().unwrap().push(request.clone());
        Ok(AutomatedMetrics {
            clap_score: 0.42,
            spectral_richness: 0.7,
            noise_floor: -60.0,
            audio_onsets: vec![0.0, 1.5],
        })
    }

    async fn health(&self) -> Result<(), BackendError> {
        if *self.healthy.lock().unwrap() {
            Ok(())
        } else {
            Err(BackendError::Network("connection refused".to_string()))
        }
    }
}

/// Record sink that forwards submissions to a channel
pub struct ChannelSink {
    pub tx: mpsc::UnboundedSender<RecordSubmission>,
}

#[async_trait]
impl RecordSink for ChannelSink {
    async fn submit(&self, record: &RecordSubmission) -> Result<(), BackendError> {
        let _ = self.tx.send(record.clone());
        Ok(())
    }
}

pub fn test_state(backend: Arc<ScriptedBackend>) -> AppState {
    AppState::new(backend, None, EventBus::new(256), 2.0)
}

pub fn test_state_with_sink(
    backend: Arc<ScriptedBackend>,
) -> (AppState, mpsc::UnboundedReceiver<RecordSubmission>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn RecordSink> = Arc::new(ChannelSink { tx });
    (AppState::new(backend, Some(sink), EventBus::new(256), 2.0), rx)
}

/// Decompose the scripted story into `state.scene`
pub async fn decompose(state: &AppState) -> Vec<uuid::Uuid> {
    state
        .pipeline
        .decomposer
        .decompose(&state.scene, "A storm rolls in over the harbour.", 2.0)
        .await
        .unwrap()
        .cue_ids
}

/// Map of prompt text to cue state, in registry order
pub async fn states_by_prompt(state: &AppState) -> Vec<(String, bgm_common::events::CueState)> {
    let guard = state.scene.read().await;
    guard
        .as_ref()
        .unwrap()
        .registry
        .list()
        .iter()
        .map(|cue| (cue.generation_text().to_string(), cue.state()))
        .collect()
}
