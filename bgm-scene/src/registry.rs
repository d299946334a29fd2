//! Cue Registry
//!
//! Ordered collection of cues keyed by id. Insertion order is the timeline
//! and display order; point updates never reorder or duplicate entries.
//! The registry is only replaced wholesale, never merged.

use crate::models::{Cue, CuePatch, ParamError};
use bgm_common::events::CueState;
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct CueRegistry {
    cues: Vec<Cue>,
}

impl CueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `initial_cues`, keeping their order
    pub fn from_cues(initial_cues: Vec<Cue>) -> Self {
        let mut registry = Self::new();
        registry.create(initial_cues);
        registry
    }

    /// Replace the whole registry
    ///
    /// All previous cues are discarded. A repeated id keeps its first
    /// occurrence.
    pub fn create(&mut self, initial_cues: Vec<Cue>) {
        let mut seen = HashSet::with_capacity(initial_cues.len());
        self.cues = initial_cues
            .into_iter()
            .filter(|cue| {
                let fresh = seen.insert(cue.id());
                if !fresh {
                    warn!(cue_id = %cue.id(), "Duplicate cue id dropped from registry");
                }
                fresh
            })
            .collect();
    }

    /// Merge `patch` into the cue matching `id`
    ///
    /// Returns `Ok(false)` when no cue has that id; this is how callbacks
    /// from a superseded scene are absorbed.
    pub fn update(&mut self, id: Uuid, patch: &CuePatch) -> Result<bool, ParamError> {
        match self.get_mut(id) {
            Some(cue) => cue.apply_patch(patch).map(|_| true),
            None => Ok(false),
        }
    }

    /// Run `f` against the cue matching `id`, if present
    pub fn update_with<R>(&mut self, id: Uuid, f: impl FnOnce(&mut Cue) -> R) -> Option<R> {
        self.get_mut(id).map(f)
    }

    pub fn get(&self, id: Uuid) -> Option<&Cue> {
        self.cues.iter().find(|cue| cue.id() == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Cue> {
        self.cues.iter_mut().find(|cue| cue.id() == id)
    }

    /// Cues in insertion order
    pub fn list(&self) -> &[Cue] {
        &self.cues
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.cues.iter().map(Cue::id).collect()
    }

    /// Cues currently `Ready`, in insertion order
    pub fn ready(&self) -> impl Iterator<Item = &Cue> {
        self.in_state(CueState::Ready)
    }

    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.in_state(CueState::Pending).map(Cue::id).collect()
    }

    pub fn in_state(&self, state: CueState) -> impl Iterator<Item = &Cue> {
        self.cues.iter().filter(move |cue| cue.state() == state)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}
