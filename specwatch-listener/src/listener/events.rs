// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context types supplied by the test-execution engine alongside its callbacks.

use serde::{Deserialize, Serialize};
use specwatch_model::{Problem, ProblemKind, SpecInfo};

/// The context accompanying an `error` callback.
///
/// When a specification fails to initialize, the engine skips its own
/// `beforeSpec`/`afterSpec` bracketing and only delivers this context; the `spec`
/// link is the walk-back path the listener uses to synthesize the missing calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    /// The specification the error belongs to, if it can be recovered from the
    /// originating method reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<SpecInfo>,

    /// The method in which the error occurred, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<MethodInfo>,

    /// The engine-supplied error information.
    pub error: ErrorSummary,
}

impl ErrorContext {
    /// Creates a new `ErrorContext` around the given error.
    pub fn new(error: ErrorSummary) -> Self {
        Self {
            spec: None,
            method: None,
            error,
        }
    }

    /// Sets the owning specification.
    pub fn set_spec(&mut self, spec: SpecInfo) -> &mut Self {
        self.spec = Some(spec);
        self
    }

    /// Sets the originating method.
    pub fn set_method(&mut self, method: MethodInfo) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// Builds a [`Problem`] of the given kind from this context.
    pub fn to_problem(&self, kind: ProblemKind) -> Problem {
        let mut problem = match kind {
            ProblemKind::Failure => Problem::failure(&self.error.message),
            ProblemKind::SpecInitialization => Problem::spec_initialization(&self.error.message),
            ProblemKind::Sentinel => Problem::sentinel(&self.error.message),
        };
        if let Some(method) = &self.method {
            problem.set_method(&method.name);
        }
        if let Some(details) = &self.error.details {
            problem.set_details(details);
        }
        problem
    }
}

/// The engine-supplied rendering of an error or exception.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    /// The error message.
    pub message: String,

    /// Further detail, typically a stack trace rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorSummary {
    /// Creates a new `ErrorSummary` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Sets the details.
    pub fn set_details(&mut self, details: impl Into<String>) -> &mut Self {
        self.details = Some(details.into());
        self
    }
}

/// The method a callback or error refers to.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    /// The method's name.
    pub name: String,

    /// What role the method plays in the specification's lifecycle.
    pub kind: MethodKind,
}

impl MethodInfo {
    /// Creates a new `MethodInfo`.
    pub fn new(name: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The lifecycle role of a method.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodKind {
    /// Specification construction/initialization.
    Initializer,

    /// Once-per-spec setup.
    SetupSpec,

    /// Per-iteration setup.
    Setup,

    /// A feature method body.
    Feature,

    /// Per-iteration cleanup.
    Cleanup,

    /// Once-per-spec cleanup.
    CleanupSpec,
}
