// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bootstrap extension: one-time producer construction and listener attachment.
//!
//! The engine may call [`ReportExtension::start`] from several threads at once;
//! the producer is constructed exactly once regardless. If construction fails, no
//! listener is ever attached — a listener backed by no producer would silently
//! discard every run.

use crate::{
    config::ExtensionConfig,
    errors::{DisplayErrorChain, ExtensionConfigError},
    listener::SpecListener,
    producer::{ProducerRegistry, ReportProducer},
};
use debug_ignore::DebugIgnore;
use std::{
    path::Path,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Process-wide entry point: constructs the configured report producer once and
/// attaches a fresh [`SpecListener`] per observed specification.
#[derive(Debug)]
pub struct ReportExtension {
    registry: ProducerRegistry,
    // None inside the OnceLock means startup ran and declined.
    producer: OnceLock<Option<DebugIgnore<Arc<dyn ReportProducer>>>>,
    done: AtomicBool,
}

impl ReportExtension {
    /// Creates an extension backed by the given registry.
    pub fn new(registry: ProducerRegistry) -> Self {
        Self {
            registry,
            producer: OnceLock::new(),
            done: AtomicBool::new(false),
        }
    }

    /// Starts the extension with an already-loaded config.
    ///
    /// Only the first call (across all threads) has any effect.
    pub fn start(&self, config: ExtensionConfig) {
        self.init(Ok(config));
    }

    /// Starts the extension, loading the config from the given file.
    pub fn start_from_file(&self, path: impl AsRef<Path>) {
        self.init(ExtensionConfig::from_file(path));
    }

    fn init(&self, config: Result<ExtensionConfig, ExtensionConfigError>) {
        self.producer.get_or_init(|| {
            let config = match config {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(
                        error = %DisplayErrorChain::new(&error),
                        "failed to load extension config; no listeners will be attached"
                    );
                    return None;
                }
            };
            if !config.enabled {
                tracing::info!("report production disabled by config");
                return None;
            }
            match self.registry.create(&config.producer, &config) {
                Ok(producer) => Some(DebugIgnore(producer)),
                Err(error) => {
                    tracing::warn!(
                        error = %DisplayErrorChain::new(&error),
                        producer = %config.producer,
                        "failed to construct report producer; no listeners will be attached"
                    );
                    None
                }
            }
        });
    }

    /// Returns a fresh listener bound to the configured producer, or `None` if
    /// startup has not run or declined.
    pub fn attach_listener(&self) -> Option<SpecListener> {
        let producer = self.producer.get()?.as_ref()?;
        Some(SpecListener::new(Arc::clone(producer)))
    }

    /// Shuts the extension down, letting the producer flush aggregate output.
    ///
    /// Idempotent: `done()` reaches the producer at most once.
    pub fn shutdown(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(Some(producer)) = self.producer.get() {
            if let Err(error) = producer.done() {
                tracing::error!(
                    error = %DisplayErrorChain::new(&error),
                    "report producer failed to flush on shutdown"
                );
            }
        }
    }
}
