// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::PathBuf;

/// Loading or saving presets failed.
///
/// None of these are fatal to the tool; callers log them and fall back to
/// the defaults they already hold.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// The file could not be read or written.
    #[error("cannot access {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid JSON or a field has the wrong type.
    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),
    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(String),
    /// A field holds a value outside its allowed set.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Document key.
        field: &'static str,
        /// Rejected value, as written in the document.
        value: String,
    },
    /// A field is set that this build cannot honor.
    #[error("unsupported field: {0}")]
    UnsupportedField(&'static str),
    /// No preset with this id was loaded.
    #[error("unknown preset: {0:?}")]
    UnknownPreset(String),
}

impl PresetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, value: impl ToString) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
        }
    }
}
