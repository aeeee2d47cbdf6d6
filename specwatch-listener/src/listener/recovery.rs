// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery from specification initialization errors.
//!
//! The engine promises before/after bracketing for specs, features and
//! iterations, but that promise is void when the specification object itself
//! cannot be constructed: in that case only `error` is delivered. This module
//! re-establishes the bracketing by hand — synthesizing `before_spec`, a full
//! before/error/after sequence per declared feature, and `after_spec` — so every
//! downstream consumer can assume that everything in the model was properly
//! opened and closed.

use super::{
    ErrorContext,
    imp::{ListenerState, NO_FEATURE_PLACEHOLDER},
};
use crate::{errors::RecoveryError, producer::ReportProducer};
use specwatch_model::{FeatureInfo, FeatureRun, Problem, SpecInfo};

/// Prefix applied to the display name of every feature affected by an
/// initialization error.
pub const INIT_ERROR_PREFIX: &str = "<Initialization Error> ";

/// Specification name fabricated when the error context cannot be walked back to
/// an owning specification.
pub const UNKNOWN_SPEC_PLACEHOLDER: &str = "<Unknown Spec>";

const SENTINEL_MESSAGE: &str =
    "specification initialization failed; the root cause is recorded on the first feature";

/// Branch B of the error dispatcher: no specification is in progress, so the
/// error prevented the specification from starting at all.
///
/// Only the first simulated feature carries the real wrapped error; every
/// subsequent feature receives a sentinel, so the model does not pretend several
/// independent failures occurred when there was exactly one root cause.
pub(super) fn recover_initialization_error(
    state: &mut ListenerState,
    producer: &dyn ReportProducer,
    context: &ErrorContext,
) -> Result<(), RecoveryError> {
    let spec = match &context.spec {
        Some(spec) => spec.clone(),
        None => {
            // Not a path the engine is known to take; fabricate rather than drop
            // the one failure the user most needs to see.
            tracing::warn!(
                "initialization error carries no specification reference; \
                 fabricating a placeholder specification"
            );
            SpecInfo::new(UNKNOWN_SPEC_PLACEHOLDER)
        }
    };
    tracing::debug!(
        spec = %spec.name,
        features = spec.features.len(),
        "recovering from specification initialization error"
    );

    let wrapped = wrap_error(&spec, context);

    // Synthesized beforeSpec: the engine skipped it.
    state.begin_spec(spec.clone());
    state
        .current
        .as_mut()
        .expect("begin_spec just ran")
        .run
        .set_initialization_error(wrapped.clone());

    if spec.features.is_empty() {
        // The failure occurred before feature introspection was even possible.
        simulate_feature(
            state,
            FeatureInfo::new(NO_FEATURE_PLACEHOLDER),
            None,
            wrapped,
        );
    } else {
        for (index, feature) in spec.features.iter().enumerate() {
            let problem = if index == 0 {
                wrapped.clone()
            } else {
                Problem::sentinel(SENTINEL_MESSAGE)
            };
            let display_name = format!("{INIT_ERROR_PREFIX}{}", feature.name);
            simulate_feature(state, feature.clone(), Some(display_name), problem);
        }
    }

    // Synthesized afterSpec: normal finalization and hand-off.
    state
        .finish_spec(&spec, producer)
        .map_err(|error| RecoveryError::HandOff { error })
}

/// Marks the engine-supplied error as a specification-level initialization
/// error, distinct from a normal test failure.
fn wrap_error(spec: &SpecInfo, context: &ErrorContext) -> Problem {
    let mut wrapped = Problem::spec_initialization(format!(
        "failed to initialize specification `{}`: {}",
        spec.name, context.error.message
    ));
    if let Some(method) = &context.method {
        wrapped.set_method(&method.name);
    }
    if let Some(details) = &context.error.details {
        wrapped.set_details(details);
    }
    wrapped
}

/// Simulates the full before/error/after sequence for one feature that never
/// actually ran. The simulated iteration is keyed by the feature's own name.
fn simulate_feature(
    state: &mut ListenerState,
    feature: FeatureInfo,
    display_name: Option<String>,
    problem: Problem,
) {
    let iteration = feature.name.clone();
    state.begin_feature(feature);
    let feature_run = current_feature_run(state);
    if let Some(display_name) = display_name {
        feature_run.set_display_name(display_name);
    }
    state.begin_iteration(iteration.clone());
    current_feature_run(state).record_failure(iteration, problem);
    state.end_iteration();
}

fn current_feature_run(state: &mut ListenerState) -> &mut FeatureRun {
    state
        .current
        .as_mut()
        .expect("a specification is in progress during recovery")
        .run
        .current_feature_run()
        .expect("a feature run was just appended")
}
