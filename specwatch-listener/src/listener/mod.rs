// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconstruct a specification run model from engine lifecycle callbacks.
//!
//! The main type here is [`SpecListener`]: one instance per specification
//! execution, bound to one report producer.

mod events;
mod imp;
mod recovery;

pub use events::*;
pub use imp::*;
pub use recovery::{INIT_ERROR_PREFIX, UNKNOWN_SPEC_PLACEHOLDER};
