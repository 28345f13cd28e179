// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Binary fingerprint primitives.
//!
//! A fingerprint (BFP) is an immutable byte string of fixed per-index
//! length, interpreted as a bit vector of chemical features. This module
//! provides the pure bit algebra the tree pruning rules are defined in
//! terms of, plus the thin scalar surface exposed to hosts.

pub mod ops;
pub mod scalar;

#[cfg(test)]
#[path = "ops_test.rs"]
mod ops_test;

#[cfg(test)]
#[path = "scalar_test.rs"]
mod scalar_test;

pub use scalar::{bfp_dice, bfp_dummy, bfp_length, bfp_tanimoto, bfp_weight};
