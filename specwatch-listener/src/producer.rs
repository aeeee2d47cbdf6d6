// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report-producer contract and the producer registry.
//!
//! Report rendering itself is an external concern; this module only defines the
//! seam the listener hands finished models across, plus an explicit registry
//! mapping configuration keys to constructor functions (there is no reflective
//! construction anywhere).

use crate::{
    config::ExtensionConfig,
    errors::{CreateProducerError, ProducerError, UnknownProducerError},
};
use indexmap::IndexMap;
use specwatch_model::SpecRun;
use std::sync::Arc;

/// A consumer of finalized specification run models.
///
/// Implementations render or persist reports in whatever format they choose. One
/// producer instance serves the whole process; listeners share it.
pub trait ReportProducer: Send + Sync {
    /// Called exactly once per specification, after its model is fully finalized.
    ///
    /// The model is handed over by value: once a run reaches the producer, the
    /// listener holds no reference to it.
    fn create_report_for(&self, spec_run: SpecRun) -> Result<(), ProducerError>;

    /// Called once at shutdown, to flush any aggregate output.
    fn done(&self) -> Result<(), ProducerError>;
}

/// Constructor function for a report producer.
pub type ProducerFactory = fn(&ExtensionConfig) -> Result<Arc<dyn ReportProducer>, ProducerError>;

/// An explicit registry of producer factories, keyed by the config's `producer`
/// string.
#[derive(Clone, Debug, Default)]
pub struct ProducerRegistry {
    factories: IndexMap<String, ProducerFactory>,
}

impl ProducerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in producers registered.
    ///
    /// Currently this is just `"log"`, a [`LogProducer`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("log", |_config| Ok(Arc::new(LogProducer)));
        registry
    }

    /// Registers a factory under the given key, replacing any previous entry.
    pub fn register(&mut self, key: impl Into<String>, factory: ProducerFactory) -> &mut Self {
        self.factories.insert(key.into(), factory);
        self
    }

    /// Constructs the producer registered under `key`.
    pub fn create(
        &self,
        key: &str,
        config: &ExtensionConfig,
    ) -> Result<Arc<dyn ReportProducer>, CreateProducerError> {
        let factory = self.factories.get(key).ok_or_else(|| {
            UnknownProducerError::new(key, self.factories.keys().map(String::as_str))
        })?;
        factory(config).map_err(CreateProducerError::Factory)
    }
}

/// A producer that logs a one-line summary of each finalized run.
///
/// This is an observability aid, not a renderer: it exists so a default
/// configuration produces visible output without any report backend wired up.
#[derive(Debug, Default)]
pub struct LogProducer;

impl ReportProducer for LogProducer {
    fn create_report_for(&self, spec_run: SpecRun) -> Result<(), ProducerError> {
        tracing::info!(
            spec = %spec_run.spec.name,
            features = spec_run.feature_runs.len(),
            problems = spec_run.problem_count(),
            total_time = ?spec_run.total_time,
            initialization_error = spec_run.initialization_error.is_some(),
            "specification finished"
        );
        Ok(())
    }

    fn done(&self) -> Result<(), ProducerError> {
        tracing::info!("report producer done");
        Ok(())
    }
}
