// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by specwatch.

use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Displays an error and its source chain on one line, colon-separated.
pub struct DisplayErrorChain<E>(E);

impl<E: std::error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain` over the given error.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: std::error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

/// An error that occurred while loading the extension config.
#[derive(Debug, Error)]
pub enum ExtensionConfigError {
    /// The config file could not be read.
    #[error("failed to read extension config at `{}`", .path.display())]
    Read {
        /// The path to the config file.
        path: PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The config contents could not be parsed.
    #[error("failed to parse extension config")]
    Parse {
        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },
}

/// An error returned by a report producer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProducerError {
    /// An I/O error while writing out a report artifact.
    #[error("failed to write report to `{}`", .path.display())]
    Io {
        /// The path being written.
        path: PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A serialization error while producing a report.
    #[error("failed to serialize report for spec `{spec_name}`")]
    Serialize {
        /// The name of the specification being reported.
        spec_name: String,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// Any other producer-specific failure.
    #[error("{message}")]
    Message {
        /// The failure message.
        message: String,
    },
}

/// An error which indicates that a producer key was requested but is not known to
/// the registry.
#[derive(Clone, Debug, Error)]
#[error("producer `{key}` not found (known producers: {})", .known.join(", "))]
pub struct UnknownProducerError {
    key: String,
    known: Vec<String>,
}

impl UnknownProducerError {
    pub(crate) fn new(
        key: impl Into<String>,
        known: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            known: known.into_iter().map(|s| s.into()).collect(),
        }
    }
}

/// An error that occurred while constructing a report producer from the registry.
#[derive(Debug, Error)]
pub enum CreateProducerError {
    /// The requested key is not registered.
    #[error(transparent)]
    Unknown(#[from] UnknownProducerError),

    /// The registered factory failed.
    #[error("producer factory failed")]
    Factory(#[source] ProducerError),
}

/// An error raised while recovering from a specification initialization error.
///
/// These are surfaced and then swallowed by the listener: recovery already runs
/// inside error handling, and there is no further recovery layer above it.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The synthesized finalization failed to hand the report off.
    #[error("report hand-off failed during initialization-error recovery")]
    HandOff {
        /// The underlying error.
        #[source]
        error: ProducerError,
    },
}
