// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fs;
use std::path::Path;

use maskcomp_core::state::State;
use tracing::{info, warn};

use crate::PresetError;
use crate::format::{PresetsDoc, StateDoc};

/// A named state overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    /// Document key, used by `defaultId`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Reset state with this preset's fields applied.
    pub state: State,
}

/// Presets loaded from one document, in document order.
///
/// The store is read-only once loaded. A failed load leaves it empty.
#[derive(Clone, Debug, Default)]
pub struct Presets {
    default_id: String,
    reset_state: State,
    presets: Vec<Preset>,
}

impl Presets {
    /// Replaces the store with the presets in `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or the document is malformed. The
    /// store is empty afterwards.
    pub fn load_presets(&mut self, path: impl AsRef<Path>) -> Result<(), PresetError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading presets");
        self.reset();
        let text = fs::read_to_string(path).map_err(|e| PresetError::io(path, e))?;
        *self = Self::from_json_str(&text)?;
        Ok(())
    }

    /// Parses a presets document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, a missing top-level field, a metadata entry
    /// without a matching state, or a state with an invalid value.
    pub fn from_json_str(text: &str) -> Result<Self, PresetError> {
        let doc: PresetsDoc = serde_json::from_str(text)?;
        let default_id = doc
            .default_id
            .ok_or_else(|| PresetError::MissingField("defaultId".into()))?;
        let metadata = doc
            .preset_metadata
            .ok_or_else(|| PresetError::MissingField("presetMetadata".into()))?;
        let states = doc
            .preset_states
            .ok_or_else(|| PresetError::MissingField("presetStates".into()))?;

        let reset_state = match doc.reset_state.map(decode_state) {
            Some(Ok(state)) => state,
            Some(Err(e)) => {
                warn!(error = %e, "unreadable reset state, using defaults");
                State::default()
            }
            None => State::default(),
        };

        let mut presets: Vec<Preset> = Vec::with_capacity(metadata.len());
        for meta in metadata {
            let value = states
                .get(&meta.id)
                .ok_or_else(|| PresetError::MissingField(format!("presetStates.{}", meta.id)))?;
            let doc = StateDoc::from_value(value)?;
            let mut state = reset_state.clone();
            if let Some(field) = doc.overlay(&mut state)? {
                warn!(preset = %meta.id, field, "preset not supported by this build, dropped");
                continue;
            }
            if presets.iter().any(|p| p.id == meta.id) {
                warn!(preset = %meta.id, "duplicate preset id, ignored");
                continue;
            }
            info!(preset = %meta.id, "preset loaded");
            presets.push(Preset {
                id: meta.id,
                name: meta.name,
                description: meta.desc,
                state,
            });
        }

        Ok(Self {
            default_id,
            reset_state,
            presets,
        })
    }

    /// Empties the store.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// State every preset starts from.
    #[must_use]
    pub fn reset_state(&self) -> &State {
        &self.reset_state
    }

    /// Id of the preset applied on startup; empty if none was loaded.
    #[must_use]
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Id of the preset at `index` in document order.
    #[must_use]
    pub fn preset_id(&self, index: usize) -> Option<&str> {
        self.presets.get(index).map(|p| p.id.as_str())
    }

    /// Number of loaded presets.
    #[must_use]
    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    /// Looks up a preset by id.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::UnknownPreset`] if no such preset was loaded.
    pub fn preset(&self, id: &str) -> Result<&Preset, PresetError> {
        self.presets
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PresetError::UnknownPreset(id.to_owned()))
    }

    /// Loaded presets in document order.
    pub fn presets(&self) -> impl ExactSizeIterator<Item = &Preset> {
        self.presets.iter()
    }
}

fn decode_state(value: serde_json::Value) -> Result<State, PresetError> {
    let doc = StateDoc::from_value(&value)?;
    let mut state = State::default();
    doc.overlay(&mut state)?;
    Ok(state)
}

/// Parses a state document and overlays it onto `base`.
///
/// # Errors
///
/// Besides malformed input, fails with [`PresetError::UnsupportedField`] if
/// the document sets an option this build cannot honor.
pub fn parse_state(text: &str, base: &State) -> Result<State, PresetError> {
    let doc: StateDoc = serde_json::from_str(text)?;
    let mut state = base.clone();
    match doc.overlay(&mut state)? {
        Some(field) => Err(PresetError::UnsupportedField(field)),
        None => Ok(state),
    }
}

/// Loads a saved state file over the default state.
///
/// # Errors
///
/// Fails if the file cannot be read or is malformed.
pub fn load_state(path: impl AsRef<Path>) -> Result<State, PresetError> {
    let mut state = State::default();
    load_state_into(path, &mut state)?;
    Ok(state)
}

/// Loads a saved state file over `state`.
///
/// Options this build cannot honor are ignored. `state` is only modified if
/// the whole file loads.
///
/// # Errors
///
/// Fails if the file cannot be read or is malformed.
pub fn load_state_into(path: impl AsRef<Path>, state: &mut State) -> Result<(), PresetError> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading state");
    let text = fs::read_to_string(path).map_err(|e| PresetError::io(path, e))?;
    let doc: StateDoc = serde_json::from_str(&text)?;
    let mut next = state.clone();
    if let Some(field) = doc.overlay(&mut next)? {
        warn!(field, "ignoring option not supported by this build");
    }
    *state = next;
    Ok(())
}

/// Writes `state` to `path`.
///
/// Planes are always written with tracking off; their marker id and last
/// pose are kept.
///
/// # Errors
///
/// Fails if the file cannot be written.
pub fn save_state(path: impl AsRef<Path>, state: &State) -> Result<(), PresetError> {
    let path = path.as_ref();
    info!(path = %path.display(), "saving state");
    let text = serde_json::to_string_pretty(&StateDoc::from_state(state))?;
    fs::write(path, text).map_err(|e| PresetError::io(path, e))
}

/// Replaces `state` with the preset's state.
///
/// With `keep_planes` the current planes survive and only the options change.
pub fn apply_preset(preset: &Preset, state: &mut State, keep_planes: bool) {
    info!(preset = %preset.name, description = %preset.description, keep_planes, "applying preset");
    let planes = keep_planes.then(|| state.planes.clone());
    *state = preset.state.clone();
    if let Some(planes) = planes {
        state.planes = planes;
    }
}
