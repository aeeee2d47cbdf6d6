// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use indexmap::map::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity of a specification, as supplied by the test-execution engine.
///
/// Includes the statically declared feature list, which is the walk-back path used
/// when a specification fails to initialize before any feature can run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecInfo {
    /// The name of the specification.
    pub name: String,

    /// The features declared by this specification, in declaration order.
    pub features: Vec<FeatureInfo>,
}

impl SpecInfo {
    /// Creates a new `SpecInfo` with no declared features.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: vec![],
        }
    }

    /// Adds a declared feature.
    pub fn add_feature(&mut self, feature: FeatureInfo) -> &mut Self {
        self.features.push(feature);
        self
    }

    /// Adds several declared features.
    pub fn add_features(&mut self, features: impl IntoIterator<Item = FeatureInfo>) -> &mut Self {
        self.features.extend(features);
        self
    }
}

/// Identity of one feature declared within a specification.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInfo {
    /// The name of the feature.
    pub name: String,
}

impl FeatureInfo {
    /// Creates a new `FeatureInfo`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One specification's execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRun {
    /// The identity of the specification that ran.
    pub spec: SpecInfo,

    /// The feature runs of this specification, in discovery order.
    pub feature_runs: Vec<FeatureRun>,

    /// The time at which the specification began execution, including the offset
    /// from UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<DateTime<FixedOffset>>,

    /// Wall-clock duration from first-seen start to completion.
    ///
    /// This is serialized as a number of milliseconds.
    #[serde(
        rename = "totalTimeMs",
        skip_serializing_if = "Option::is_none",
        with = "millis",
        default
    )]
    pub total_time: Option<Duration>,

    /// Set only when the specification itself failed to construct, before any
    /// feature could run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialization_error: Option<Problem>,
}

impl SpecRun {
    /// Creates a new `SpecRun` for the given specification.
    pub fn new(spec: SpecInfo) -> Self {
        Self {
            spec,
            feature_runs: vec![],
            start_timestamp: None,
            total_time: None,
            initialization_error: None,
        }
    }

    /// Sets the start timestamp for the run.
    pub fn set_start_timestamp(
        &mut self,
        start_timestamp: impl Into<DateTime<FixedOffset>>,
    ) -> &mut Self {
        self.start_timestamp = Some(start_timestamp.into());
        self
    }

    /// Sets the wall-clock duration of the run.
    pub fn set_total_time(&mut self, total_time: Duration) -> &mut Self {
        self.total_time = Some(total_time);
        self
    }

    /// Records a specification-level initialization error.
    pub fn set_initialization_error(&mut self, problem: Problem) -> &mut Self {
        self.initialization_error = Some(problem);
        self
    }

    /// Appends a feature run and returns a mutable reference to it.
    pub fn add_feature_run(&mut self, feature_run: FeatureRun) -> &mut FeatureRun {
        self.feature_runs.push(feature_run);
        self.feature_runs
            .last_mut()
            .expect("feature run was just pushed")
    }

    /// Returns the feature run most recently appended, if any.
    ///
    /// This is the "current" feature during execution: features are appended in
    /// discovery order and never removed.
    pub fn current_feature_run(&mut self) -> Option<&mut FeatureRun> {
        self.feature_runs.last_mut()
    }

    /// The total number of problems recorded across all feature runs.
    pub fn problem_count(&self) -> usize {
        self.feature_runs.iter().map(FeatureRun::problem_count).sum()
    }
}

/// One feature's execution within a [`SpecRun`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRun {
    /// The identity of the feature.
    pub feature: FeatureInfo,

    /// An optional display-name override.
    ///
    /// Initialization-error recovery marks affected features through this field;
    /// the underlying [`FeatureInfo`] is never mutated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Problems recorded per iteration, keyed by iteration name.
    ///
    /// Key order is iteration discovery order. Every iteration that is begun (or
    /// fabricated) has an entry here before any problem is recorded against it.
    pub failures: IndexMap<String, Vec<Problem>>,
}

impl FeatureRun {
    /// Creates a new `FeatureRun`.
    pub fn new(feature: FeatureInfo) -> Self {
        Self {
            feature,
            display_name: None,
            failures: IndexMap::new(),
        }
    }

    /// Sets the display-name override.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) -> &mut Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// The name to display for this feature: the override if set, otherwise the
    /// feature's own name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.feature.name)
    }

    /// Ensures an (initially empty) failure list exists for the given iteration.
    pub fn begin_iteration(&mut self, iteration: impl Into<String>) -> &mut Self {
        self.failures.entry(iteration.into()).or_default();
        self
    }

    /// Records a problem against the given iteration.
    ///
    /// The iteration's entry is created if it does not exist yet, so fabricated
    /// placeholder iterations satisfy the entry-before-failure invariant as well.
    pub fn record_failure(&mut self, iteration: impl Into<String>, problem: Problem) -> &mut Self {
        self.failures.entry(iteration.into()).or_default().push(problem);
        self
    }

    /// The total number of problems recorded for this feature.
    pub fn problem_count(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }
}

/// One recorded failure, wrapping the engine-supplied error information plus the
/// method context in which it occurred.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    /// The kind of problem this is.
    pub kind: ProblemKind,

    /// The failure message.
    pub message: String,

    /// The method in which the failure occurred, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Further detail (e.g. a stack trace rendering), if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Problem {
    /// Creates a problem representing a normal test failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_kind(ProblemKind::Failure, message)
    }

    /// Creates a problem representing a specification-level initialization error.
    pub fn spec_initialization(message: impl Into<String>) -> Self {
        Self::with_kind(ProblemKind::SpecInitialization, message)
    }

    /// Creates a lightweight sentinel problem.
    ///
    /// Used for the second and subsequent features in an initialization-error
    /// fan-out, so the model does not pretend several independent failures
    /// occurred when there was exactly one root cause.
    pub fn sentinel(message: impl Into<String>) -> Self {
        Self::with_kind(ProblemKind::Sentinel, message)
    }

    fn with_kind(kind: ProblemKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            method: None,
            details: None,
        }
    }

    /// Sets the method context.
    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the failure details.
    pub fn set_details(&mut self, details: impl Into<String>) -> &mut Self {
        self.details = Some(details.into());
        self
    }
}

/// The kind of a recorded [`Problem`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    /// A normal test failure, attributed to a specific iteration.
    Failure,

    /// The wrapped error for a specification that failed to initialize before any
    /// feature could run.
    SpecInitialization,

    /// A lightweight marker pointing at a [`SpecInitialization`](Self::SpecInitialization)
    /// problem recorded elsewhere in the same run.
    Sentinel,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_millis() as u64).serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
