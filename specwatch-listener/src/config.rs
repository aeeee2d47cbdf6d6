// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the report extension.

use crate::errors::ExtensionConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Configuration consumed by the bootstrap extension.
///
/// Loaded once, before any listener is attached. Every field has a default so an
/// empty config file (or none at all) is valid.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExtensionConfig {
    /// The registry key of the report producer to construct.
    #[serde(default = "default_producer")]
    pub producer: String,

    /// Whether report production is enabled at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Free-form properties passed through to the producer factory.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            producer: default_producer(),
            enabled: default_enabled(),
            properties: IndexMap::new(),
        }
    }
}

impl ExtensionConfig {
    /// Parses a config from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self, ExtensionConfigError> {
        toml::from_str(input).map_err(|error| ExtensionConfigError::Parse { error })
    }

    /// Reads and parses a config from the given file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtensionConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|error| ExtensionConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&input)
    }
}

fn default_producer() -> String {
    "log".to_owned()
}

fn default_enabled() -> bool {
    true
}
