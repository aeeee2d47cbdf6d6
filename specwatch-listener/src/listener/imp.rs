// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lifecycle listener state machine.

use super::{ErrorContext, recovery};
use crate::{
    errors::{DisplayErrorChain, ProducerError},
    producer::ReportProducer,
    time::{StopwatchStart, stopwatch},
};
use debug_ignore::DebugIgnore;
use specwatch_model::{FeatureInfo, FeatureRun, ProblemKind, SpecInfo, SpecRun};
use std::sync::{Arc, Mutex, PoisonError};

/// Iteration key fabricated for a failure that arrives while no iteration is in
/// progress.
pub const NO_ITERATION_PLACEHOLDER: &str = "<No Iteration!>";

/// Feature name fabricated for a failure that arrives before any feature exists.
pub const NO_FEATURE_PLACEHOLDER: &str = "<No Feature initialized!>";

/// Observes one specification's execution and reconstructs its [`SpecRun`].
///
/// One listener instance is bound to exactly one specification execution and one
/// report producer. All callbacks are synchronous, finite state transitions; a
/// single mutex over the listener's state makes `before_spec`/`after_spec`
/// mutually exclusive with each other and with concurrent `error` callbacks.
#[derive(Debug)]
pub struct SpecListener {
    producer: DebugIgnore<Arc<dyn ReportProducer>>,
    state: Mutex<ListenerState>,
}

impl SpecListener {
    /// Creates a listener bound to the given producer.
    pub fn new(producer: Arc<dyn ReportProducer>) -> Self {
        Self {
            producer: DebugIgnore(producer),
            state: Mutex::new(ListenerState::default()),
        }
    }

    /// A specification is about to run.
    pub fn before_spec(&self, spec: SpecInfo) {
        tracing::debug!(spec = %spec.name, "specification started");
        self.lock_state().begin_spec(spec);
    }

    /// A feature of the current specification is about to run.
    ///
    /// # Panics
    ///
    /// Panics if no specification is in progress: that is a protocol violation by
    /// the engine, not a recoverable runtime condition.
    pub fn before_feature(&self, feature: FeatureInfo) {
        self.lock_state().begin_feature(feature);
    }

    /// An iteration of the current feature is about to run.
    pub fn before_iteration(&self, iteration: impl Into<String>) {
        self.lock_state().begin_iteration(iteration.into());
    }

    /// The named iteration finished. Its failure list stays in the model.
    pub fn after_iteration(&self, _iteration: &str) {
        self.lock_state().end_iteration();
    }

    /// The named feature finished.
    ///
    /// The feature's data is already fully attached to the model; this exists for
    /// bracketing symmetry with [`before_feature`](Self::before_feature).
    pub fn after_feature(&self, feature: &FeatureInfo) {
        tracing::debug!(feature = %feature.name, "feature finished");
    }

    /// The specification finished: finalize the model and hand it off.
    ///
    /// Producer failures are logged and absorbed; nothing propagates back into
    /// the engine.
    ///
    /// # Panics
    ///
    /// Panics if `spec` does not match the specification in progress (a protocol
    /// violation by the engine).
    pub fn after_spec(&self, spec: &SpecInfo) {
        let result = self.lock_state().finish_spec(spec, &**self.producer);
        if let Err(error) = result {
            tracing::error!(
                spec = %spec.name,
                error = %DisplayErrorChain::new(&error),
                "report producer failed; error absorbed"
            );
        }
    }

    /// The specification was skipped. No-op: skip status is recoverable from the
    /// identity objects by the downstream consumer.
    pub fn spec_skipped(&self, _spec: &SpecInfo) {}

    /// A feature was skipped. No-op, as with [`spec_skipped`](Self::spec_skipped).
    pub fn feature_skipped(&self, _feature: &FeatureInfo) {}

    /// An error occurred somewhere in the specification's execution.
    ///
    /// If a specification is in progress, the failure is attributed to the
    /// current iteration (fabricating placeholder entities if the cursor is
    /// empty, so it is never lost). If none is — the engine failed before
    /// `before_spec`, its one documented bracketing gap — the full lifecycle is
    /// synthesized around the error instead. Failures inside that recovery are
    /// surfaced and swallowed; there is no recovery layer above it.
    pub fn error(&self, context: ErrorContext) {
        let mut state = self.lock_state();
        if state.current.is_some() {
            state.record_problem(&context);
        } else if let Err(error) =
            recovery::recover_initialization_error(&mut state, &**self.producer, &context)
        {
            tracing::error!(
                error = %DisplayErrorChain::new(&error),
                "initialization-error recovery failed; error swallowed"
            );
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ListenerState> {
        // A panicked callback must not stop later failures from being recorded.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The listener's mutable cursor state: at most one specification alive at a
/// time, plus the current-iteration sub-cursor.
#[derive(Debug, Default)]
pub(super) struct ListenerState {
    pub(super) current: Option<CurrentSpec>,
    pub(super) current_iteration: Option<String>,
}

/// The specification currently in progress.
#[derive(Debug)]
pub(super) struct CurrentSpec {
    pub(super) run: SpecRun,
    stopwatch: StopwatchStart,
}

impl ListenerState {
    pub(super) fn begin_spec(&mut self, spec: SpecInfo) {
        self.current = Some(CurrentSpec {
            run: SpecRun::new(spec),
            stopwatch: stopwatch(),
        });
    }

    pub(super) fn begin_feature(&mut self, feature: FeatureInfo) {
        let current = self.current_mut("beforeFeature");
        current.run.add_feature_run(FeatureRun::new(feature));
    }

    pub(super) fn begin_iteration(&mut self, iteration: String) {
        let current = self.current_mut("beforeIteration");
        let feature_run = current
            .run
            .current_feature_run()
            .unwrap_or_else(|| panic!("beforeIteration called before any feature was started"));
        feature_run.begin_iteration(iteration.clone());
        self.current_iteration = Some(iteration);
    }

    pub(super) fn end_iteration(&mut self) {
        self.current_iteration = None;
    }

    /// Branch A of the error dispatcher: a specification is in progress.
    pub(super) fn record_problem(&mut self, context: &ErrorContext) {
        let iteration = self
            .current_iteration
            .clone()
            .unwrap_or_else(|| NO_ITERATION_PLACEHOLDER.to_owned());
        let current = self.current_mut("error");
        let run = &mut current.run;
        if run.feature_runs.is_empty() {
            run.add_feature_run(FeatureRun::new(FeatureInfo::new(NO_FEATURE_PLACEHOLDER)));
        }
        run.current_feature_run()
            .expect("a feature run exists at this point")
            .record_failure(iteration, context.to_problem(ProblemKind::Failure));
    }

    /// Finalizes the current run and hands it to the producer by value.
    pub(super) fn finish_spec(
        &mut self,
        spec: &SpecInfo,
        producer: &dyn ReportProducer,
    ) -> Result<(), ProducerError> {
        let current = self
            .current
            .take()
            .unwrap_or_else(|| panic!("afterSpec called with no specification in progress"));
        assert_eq!(
            current.run.spec.name, spec.name,
            "afterSpec called for a specification that is not in progress",
        );
        self.current_iteration = None;

        let CurrentSpec { mut run, stopwatch } = current;
        let snapshot = stopwatch.snapshot();
        run.set_start_timestamp(snapshot.start_time.fixed_offset());
        run.set_total_time(snapshot.duration);
        tracing::debug!(
            spec = %run.spec.name,
            total_time = ?snapshot.duration,
            "specification finished, handing off report"
        );
        producer.create_report_for(run)
    }

    fn current_mut(&mut self, operation: &str) -> &mut CurrentSpec {
        self.current
            .as_mut()
            .unwrap_or_else(|| panic!("{operation} called with no specification in progress"))
    }
}
