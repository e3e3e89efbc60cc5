// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File locations used by the controller.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default presets document.
pub const PRESETS_FILENAME: &str = "maskingtool-presets.json";
/// Alternate presets document loaded by the test presets toggle.
pub const TEST_PRESETS_FILENAME: &str = "maskingtool-testpresets.json";
/// Saved state file.
pub const STATE_FILENAME: &str = "maskingtool-saved.json";

/// An application config file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid config document.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Paths of the files the controller uses.
///
/// Fields missing from a config document keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    /// Presets loaded at startup.
    pub presets_path: PathBuf,
    /// Presets loaded while test presets are active.
    pub test_presets_path: PathBuf,
    /// Saved state, read at startup and by the load and save actions.
    pub state_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets_path: PRESETS_FILENAME.into(),
            test_presets_path: TEST_PRESETS_FILENAME.into(),
            state_path: STATE_FILENAME.into(),
        }
    }
}

impl AppConfig {
    /// Config with every file placed in `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            presets_path: dir.join(PRESETS_FILENAME),
            test_presets_path: dir.join(TEST_PRESETS_FILENAME),
            state_path: dir.join(STATE_FILENAME),
        }
    }

    /// Reads a config document.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses a config document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or unknown fields.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
