// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core listener logic for specwatch.
//!
//! This crate sits between a test-execution engine and a report producer. The
//! engine drives a [`SpecListener`](listener::SpecListener) through lifecycle
//! callbacks for one specification at a time; the listener reconstructs a
//! [`SpecRun`](specwatch_model::SpecRun) model of what happened, compensating for
//! the one documented case where the engine skips its own bracketing callbacks
//! (specification initialization failure), and hands the finished model to a
//! [`ReportProducer`](producer::ReportProducer).

pub mod config;
pub mod errors;
pub mod extension;
pub mod listener;
pub mod producer;
mod time;
