// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for node items.

use super::item::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfp::ops;
    use crate::rdtree::types::{NodeLayout, DEFAULT_PAGE_SIZE};

    fn layout() -> NodeLayout {
        NodeLayout::new(8, DEFAULT_PAGE_SIZE).unwrap()
    }

    #[test]
    fn test_leaf_item_degenerate_bounds() {
        let bfp = vec![0x0f, 0x00, 0xf0, 0x01, 0x00, 0x00, 0x00, 0x80];
        let item = Item::leaf(7, bfp.clone());
        assert_eq!(item.id, 7);
        assert_eq!(item.min_weight, item.max_weight);
        assert_eq!(usize::from(item.min_weight), ops::weight(&bfp));
        assert_eq!(item.max, bfp);
        assert_eq!(item.bfp, bfp);
    }

    #[test]
    fn test_wire_roundtrip() {
        let layout = layout();
        let item = Item {
            id: -3,
            min_weight: 2,
            max_weight: 40,
            bfp: vec![0xaa; 8],
            max: vec![0xbb; 8],
        };
        let mut buf = vec![0u8; layout.item_bytes];
        item.write_to(&mut buf, &layout);
        let back = Item::read_from(&buf, &layout);
        assert_eq!(back, item);
        // id is big-endian at offset 0
        assert_eq!(i64::from_be_bytes(buf[0..8].try_into().unwrap()), -3);
    }

    #[test]
    fn test_extend_bounds_covers_added() {
        let a = Item::leaf(1, vec![0x0f; 8]);
        let b = Item::leaf(2, vec![0xf0; 8]);
        let mut bounds = a.clone();
        bounds.extend_bounds(&b);

        assert!(bounds.contains(&a));
        assert!(bounds.contains(&b));
        assert_eq!(bounds.bfp, vec![0xff; 8]);
        assert_eq!(bounds.min_weight, 32);
        assert_eq!(bounds.max_weight, 32);
        // the canonical max is one of the operands' max values
        assert!(bounds.max == a.max || bounds.max == b.max);
    }

    #[test]
    fn test_extend_bounds_widens_weight_window() {
        let light = Item::leaf(1, {
            let mut v = vec![0u8; 8];
            v[0] = 0x01;
            v
        });
        let heavy = Item::leaf(2, vec![0xff; 8]);
        let mut bounds = light.clone();
        bounds.extend_bounds(&heavy);
        assert_eq!(bounds.min_weight, 1);
        assert_eq!(bounds.max_weight, 64);
    }

    #[test]
    fn test_contains_requires_all_bounds() {
        let inner = Item::leaf(1, vec![0x01; 8]);
        let mut outer = inner.clone();
        outer.extend_bounds(&Item::leaf(2, vec![0x03; 8]));
        assert!(outer.contains(&inner));

        // weight window violation
        let mut narrow = outer.clone();
        narrow.min_weight = 100;
        assert!(!narrow.contains(&inner));

        // envelope violation
        let stranger = Item::leaf(3, vec![0x80; 8]);
        assert!(!outer.contains(&stranger));
    }

    #[test]
    fn test_growth() {
        let base = Item::leaf(1, vec![0x0f; 8]);
        assert_eq!(base.growth(&Item::leaf(2, vec![0x0f; 8])), 0);
        assert_eq!(base.growth(&Item::leaf(2, vec![0xff; 8])), 32);
    }

    #[test]
    fn test_weight_distance() {
        let a = Item {
            id: 1,
            min_weight: 4,
            max_weight: 10,
            bfp: vec![0; 8],
            max: vec![0; 8],
        };
        let b = Item {
            id: 2,
            min_weight: 7,
            max_weight: 8,
            bfp: vec![0; 8],
            max: vec![0; 8],
        };
        assert_eq!(a.weight_distance(&b), 5.0);
        assert_eq!(b.weight_distance(&a), 5.0);
        assert_eq!(a.weight_distance(&a), 0.0);
    }
}
