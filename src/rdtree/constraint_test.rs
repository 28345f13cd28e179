// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for match constraints.

use super::constraint::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfp::ops;
    use crate::error::FingerError;
    use crate::rdtree::item::Item;
    use crate::rdtree::types::Strategy;
    use crate::store::{Geometry, MemStorage, Storage};

    const B: usize = 16;

    fn store() -> MemStorage {
        MemStorage::create(Geometry::new(B, 4 + 56 * 10, Strategy::Generic))
    }

    fn fp(byte: u8) -> Vec<u8> {
        vec![byte; B]
    }

    #[test]
    fn test_blob_framing() {
        let blob = subset_query(&fp(0x0f));
        assert_eq!(&blob[0..4], &0x3DAF_12ABu32.to_be_bytes());
        assert_eq!(&blob[4..8], &0x7C4F_9902u32.to_be_bytes());
        assert_eq!(&blob[8..], fp(0x0f).as_slice());

        let blob = tanimoto_query(&fp(0x0f), 0.5);
        assert_eq!(&blob[4..8], &0xF832_4B5Eu32.to_be_bytes());
        assert_eq!(blob.len(), 8 + B + 8);
    }

    #[test]
    fn test_deserialize_roundtrip() {
        let blob = subset_query(&fp(0x3c));
        let constraint = Constraint::deserialize(&blob, B).unwrap();
        assert_eq!(constraint.serialize(), blob);

        let blob = tanimoto_query(&fp(0x3c), 0.75);
        let constraint = Constraint::deserialize(&blob, B).unwrap();
        assert_eq!(constraint.serialize(), blob);
    }

    #[test]
    fn test_deserialize_rejections() {
        // too short
        assert!(matches!(
            Constraint::deserialize(&[1, 2, 3], B),
            Err(FingerError::ParseError { .. })
        ));
        // wrong container magic
        let mut blob = subset_query(&fp(1));
        blob[0] ^= 0xff;
        assert!(matches!(
            Constraint::deserialize(&blob, B),
            Err(FingerError::ParseError { .. })
        ));
        // unknown kind magic
        let mut blob = subset_query(&fp(1));
        blob[4] ^= 0xff;
        assert!(matches!(
            Constraint::deserialize(&blob, B),
            Err(FingerError::ParseError { .. })
        ));
        // wrong payload length for the index
        let blob = subset_query(&vec![1u8; B + 3]);
        assert!(matches!(
            Constraint::deserialize(&blob, B),
            Err(FingerError::LengthMismatch { .. })
        ));
        let blob = tanimoto_query(&vec![1u8; B - 1], 0.5);
        assert!(matches!(
            Constraint::deserialize(&blob, B),
            Err(FingerError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_subset_accepts_supersets_only() {
        let store = store();
        let mut c = Constraint::deserialize(&subset_query(&fp(0x0f)), B).unwrap();
        c.initialize(&store).unwrap();

        assert!(c.test_leaf(&Item::leaf(1, fp(0x0f))));
        assert!(c.test_leaf(&Item::leaf(2, fp(0xff))));
        assert!(!c.test_leaf(&Item::leaf(3, fp(0xf0))));
        assert!(!c.test_leaf(&Item::leaf(4, fp(0x07))));
    }

    #[test]
    fn test_subset_internal_weight_pruning() {
        let store = store();
        let mut c = Constraint::deserialize(&subset_query(&fp(0x0f)), B).unwrap();
        c.initialize(&store).unwrap();

        // envelope contains the query but every descendant is too light
        let mut item = Item::leaf(1, fp(0xff));
        item.max_weight = 8;
        assert!(!c.test_internal(&item));

        // heavy enough and containing
        let item = Item::leaf(1, fp(0xff));
        assert!(c.test_internal(&item));
    }

    #[test]
    fn test_tanimoto_exact_leaf_threshold() {
        let store = store();
        let mut c = Constraint::deserialize(&tanimoto_query(&fp(0x0f), 0.5), B).unwrap();
        c.initialize(&store).unwrap();

        // identical: similarity 1
        assert!(c.test_leaf(&Item::leaf(1, fp(0x0f))));
        // 0x0f vs 0xff: 4/8 per byte = 0.5, on the threshold
        assert!(c.test_leaf(&Item::leaf(2, fp(0xff))));
        // disjoint: 0
        assert!(!c.test_leaf(&Item::leaf(3, fp(0xf0))));
    }

    #[test]
    fn test_tanimoto_weight_window_pruning() {
        let store = store();
        let mut c = Constraint::deserialize(&tanimoto_query(&fp(0x0f), 0.5), B).unwrap();
        c.initialize(&store).unwrap();

        // |q| = 64; matches need weight in [32, 128]
        let mut too_light = Item::leaf(1, fp(0x0f));
        too_light.min_weight = 0;
        too_light.max_weight = 31;
        assert!(!c.test_internal(&too_light));

        let mut too_heavy = Item::leaf(2, fp(0xff));
        too_heavy.min_weight = 129;
        too_heavy.max_weight = 200;
        assert!(!c.test_internal(&too_heavy));
    }

    #[test]
    fn test_tanimoto_filter_prefers_rare_bits() {
        let mut store = store();
        // bits 0 and 1 are common in the collection, the rest of the
        // query bits are rare
        for _ in 0..10 {
            store.increment_bit_freq(0).unwrap();
            store.increment_bit_freq(1).unwrap();
        }

        // query has bits 0..8 set (first byte 0xff): |q| = 8,
        // τ = 0.875 → k = ⌈0.125*8⌉+1 = 2 filter bits
        let mut q = vec![0u8; B];
        q[0] = 0xff;
        let mut c = Constraint::deserialize(&tanimoto_query(&q, 0.875), B).unwrap();
        c.initialize(&store).unwrap();

        // the filter must have skipped the two common bits
        let mut probe = vec![0u8; B];
        probe[0] = 0b0000_0011; // only the common bits
        let mut item = Item::leaf(1, probe);
        item.min_weight = 7;
        item.max_weight = 8;
        assert!(!c.test_internal(&item));

        let mut probe = vec![0u8; B];
        probe[0] = 0b0000_1100; // rare bits present
        let mut item = Item::leaf(2, probe);
        item.min_weight = 7;
        item.max_weight = 8;
        // passes the filter check but fails the envelope bound
        // (2 >= 0.875 * 8 is false)
        assert!(!c.test_internal(&item));

        let mut probe = vec![0u8; B];
        probe[0] = 0xfe; // rare bits plus enough overlap for the bound
        let mut item = Item::leaf(3, probe);
        item.min_weight = 7;
        item.max_weight = 8;
        assert!(c.test_internal(&item));
    }

    #[test]
    fn test_tanimoto_high_weight_low_threshold_filter_capped() {
        let store = store();
        // |q| = 128, τ = 0.1 → uncapped k would be 117, capped fits
        let mut c = Constraint::deserialize(&tanimoto_query(&fp(0xff), 0.1), B).unwrap();
        c.initialize(&store).unwrap();
        // an identical row still matches
        assert!(c.test_leaf(&Item::leaf(1, fp(0xff))));
    }

    #[test]
    fn test_tanimoto_empty_query_matches_nothing() {
        let store = store();
        let mut c = Constraint::deserialize(&tanimoto_query(&fp(0x00), 0.5), B).unwrap();
        c.initialize(&store).unwrap();
        // the filter is empty, so even an all-zero row is rejected by the
        // intersect pre-check
        assert!(!c.test_leaf(&Item::leaf(1, fp(0x00))));
        assert!(!c.test_internal(&Item::leaf(2, fp(0xff))));
    }

    #[test]
    fn test_filter_is_subset_of_query() {
        let mut store = store();
        for bit in 0..(8 * B) {
            if bit % 3 == 0 {
                store.increment_bit_freq(bit).unwrap();
            }
        }
        let q = fp(0x5a);
        let mut c = Constraint::deserialize(&tanimoto_query(&q, 0.6), B).unwrap();
        c.initialize(&store).unwrap();
        // round-trip through serialize keeps the query fingerprint intact
        let blob = c.serialize();
        assert_eq!(&blob[8..8 + B], q.as_slice());
        // accepting an identical row implies the filter stayed inside q
        assert!(c.test_leaf(&Item::leaf(1, q.clone())));
        let _ = ops::weight(&q);
    }
}
