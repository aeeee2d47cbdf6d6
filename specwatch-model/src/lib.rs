// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Data model for specification run reports.
//!
//! These are passive containers: a [`SpecRun`] describes one specification's
//! execution, owning [`FeatureRun`]s which in turn own the [`Problem`]s recorded
//! against each iteration. All mutation is performed by the lifecycle listener in
//! the `specwatch-listener` crate; report producers receive a finalized, immutable
//! view.

mod report;

pub use report::*;
