// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Scalar fingerprint functions.
//!
//! The thin, host-facing wrappers around the bit algebra: weight, length,
//! Tanimoto and Dice similarity, and a constant-byte test fingerprint.
//! Missing (SQL NULL) arguments are modelled as `Option::None` and
//! propagate to a `None` result; combining fingerprints of different
//! lengths is a typed error.

use super::ops;
use crate::error::{FingerError, FingerResult};
use crate::rdtree::types::MAX_BFP_BYTES;

/// Population count of a fingerprint.
///
/// ## Output
/// - `None` when the argument is missing, otherwise the number of set bits
pub fn bfp_weight(bfp: Option<&[u8]>) -> Option<i64> {
    bfp.map(|b| ops::weight(b) as i64)
}

/// Length of a fingerprint in bits.
///
/// ## Output
/// - `None` when the argument is missing, otherwise `8 * len`
pub fn bfp_length(bfp: Option<&[u8]>) -> Option<i64> {
    bfp.map(|b| 8 * b.len() as i64)
}

/// Tanimoto similarity of two fingerprints.
///
/// ## Output
/// - `Ok(None)` when either argument is missing
/// - `Ok(Some(t))` with `t ∈ [0, 1]` otherwise
///
/// ## Error Conditions
/// - `LengthMismatch` when the fingerprints differ in length
pub fn bfp_tanimoto(a: Option<&[u8]>, b: Option<&[u8]>) -> FingerResult<Option<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            check_lengths(a, b)?;
            Ok(Some(ops::tanimoto(a, b)))
        }
        _ => Ok(None),
    }
}

/// Dice similarity of two fingerprints.
///
/// ## Output
/// - `Ok(None)` when either argument is missing
/// - `Ok(Some(d))` with `d ∈ [0, 1]` otherwise
///
/// ## Error Conditions
/// - `LengthMismatch` when the fingerprints differ in length
pub fn bfp_dice(a: Option<&[u8]>, b: Option<&[u8]>) -> FingerResult<Option<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            check_lengths(a, b)?;
            Ok(Some(ops::dice(a, b)))
        }
        _ => Ok(None),
    }
}

/// Build a constant-byte fingerprint, mostly for testing.
///
/// ## Input
/// - `nbits`: requested length in bits, clamped to `[8, 8 * 256]`
/// - `byteval`: byte value repeated over the fingerprint (`& 0xFF`)
///
/// ## Output
/// - A fingerprint of `nbits / 8` bytes, each equal to `byteval & 0xFF`
pub fn bfp_dummy(nbits: i64, byteval: i64) -> Vec<u8> {
    let nbits = nbits.clamp(8, 8 * MAX_BFP_BYTES as i64);
    let len = (nbits / 8) as usize;
    vec![(byteval & 0xff) as u8; len]
}

fn check_lengths(a: &[u8], b: &[u8]) -> FingerResult<()> {
    if a.len() != b.len() {
        return Err(FingerError::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}
