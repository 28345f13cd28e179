// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for the scalar fingerprint functions.

use super::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FingerError;

    #[test]
    fn test_bfp_dummy_sizes() {
        assert_eq!(bfp_dummy(128, 0).len(), 16);
        assert_eq!(bfp_dummy(1024, 0xff).len(), 128);
        // clamped low and high
        assert_eq!(bfp_dummy(0, 1).len(), 1);
        assert_eq!(bfp_dummy(-100, 1).len(), 1);
        assert_eq!(bfp_dummy(1 << 20, 1).len(), 256);
        // byte value wraps to u8
        assert!(bfp_dummy(64, 0x1ff).iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_weight_and_length() {
        let fp = bfp_dummy(128, 3);
        assert_eq!(bfp_weight(Some(&fp)), Some(32));
        assert_eq!(bfp_length(Some(&fp)), Some(128));
        assert_eq!(bfp_weight(None), None);
        assert_eq!(bfp_length(None), None);
    }

    #[test]
    fn test_tanimoto_literal() {
        let a = bfp_dummy(128, 3);
        let b = bfp_dummy(128, 1);
        assert_eq!(bfp_tanimoto(Some(&a), Some(&b)).unwrap(), Some(0.5));
    }

    #[test]
    fn test_dice_literal() {
        let a = bfp_dummy(128, 3);
        let b = bfp_dummy(128, 1);
        let d = bfp_dice(Some(&a), Some(&b)).unwrap().unwrap();
        assert!((d - 0.6667).abs() < 1e-3);
    }

    #[test]
    fn test_null_propagation() {
        let a = bfp_dummy(64, 1);
        assert_eq!(bfp_tanimoto(None, Some(&a)).unwrap(), None);
        assert_eq!(bfp_tanimoto(Some(&a), None).unwrap(), None);
        assert_eq!(bfp_dice(None, None).unwrap(), None);
    }

    #[test]
    fn test_length_mismatch() {
        let a = bfp_dummy(64, 1);
        let b = bfp_dummy(128, 1);
        match bfp_tanimoto(Some(&a), Some(&b)) {
            Err(FingerError::LengthMismatch { expected, actual }) => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 16);
            }
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
        assert!(bfp_dice(Some(&a), Some(&b)).is_err());
    }
}
