// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for index geometry and declaration parsing.

use super::types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_small_fingerprint_capped_at_max_items() {
        // 16-byte fingerprints: item = 8 + 2 + 2 + 32 = 44 bytes, so a 4KB
        // page could hold far more than the item cap allows
        let layout = NodeLayout::new(16, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(layout.item_bytes, 44);
        assert_eq!(layout.capacity, MAX_NODE_CAPACITY);
        assert_eq!(layout.node_size, 4 + 44 * MAX_NODE_CAPACITY);
    }

    #[test]
    fn test_layout_large_fingerprint_limited_by_page() {
        let layout = NodeLayout::new(256, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(layout.item_bytes, 524);
        assert_eq!(layout.node_size, DEFAULT_PAGE_SIZE - PAGE_OVERHEAD);
        assert_eq!(layout.capacity, (layout.node_size - 4) / 524);
        assert!(layout.capacity < MAX_NODE_CAPACITY);
    }

    #[test]
    fn test_layout_min_fill_is_ceiling_third() {
        let mut layout = NodeLayout::new(128, DEFAULT_PAGE_SIZE).unwrap();
        layout.capacity = 51;
        assert_eq!(layout.min_fill(), 17);
        layout.capacity = 7;
        assert_eq!(layout.min_fill(), 3);
        layout.capacity = 8;
        assert_eq!(layout.min_fill(), 3);
    }

    #[test]
    fn test_layout_rejects_bad_sizes() {
        assert!(NodeLayout::new(0, DEFAULT_PAGE_SIZE).is_err());
        assert!(NodeLayout::new(257, DEFAULT_PAGE_SIZE).is_err());
    }

    #[test]
    fn test_layout_roundtrip_from_node_size() {
        let layout = NodeLayout::new(64, DEFAULT_PAGE_SIZE).unwrap();
        let reopened = NodeLayout::from_node_size(64, layout.node_size).unwrap();
        assert_eq!(layout, reopened);
    }

    #[test]
    fn test_parse_bits_declaration() {
        let decl = Declaration::parse("id, s bits(1024)").unwrap();
        assert_eq!(decl.id_column, "id");
        assert_eq!(decl.bfp_column, "s");
        assert_eq!(decl.bfp_bytes, 128);
        assert_eq!(decl.strategy, Strategy::Generic);
    }

    #[test]
    fn test_parse_bytes_declaration_with_option() {
        let decl = Declaration::parse("pk, fp bytes(64), OPT_FOR_SUBSET_QUERIES").unwrap();
        assert_eq!(decl.id_column, "pk");
        assert_eq!(decl.bfp_column, "fp");
        assert_eq!(decl.bfp_bytes, 64);
        assert_eq!(decl.strategy, Strategy::Subset);

        let decl = Declaration::parse("id, s bits(256), OPT_FOR_SIMILARITY_QUERIES").unwrap();
        assert_eq!(decl.strategy, Strategy::Similarity);
    }

    #[test]
    fn test_parse_tolerates_spaces_in_size_spec() {
        let decl = Declaration::parse("id, s bits( 256 )").unwrap();
        assert_eq!(decl.bfp_bytes, 32);
    }

    #[test]
    fn test_parse_rejections() {
        // arity
        assert!(Declaration::parse("id").is_err());
        assert!(Declaration::parse("id, s bits(8), OPT_FOR_SUBSET_QUERIES, extra").is_err());
        // bits not divisible by 8
        assert!(Declaration::parse("id, s bits(100)").is_err());
        // non-positive sizes
        assert!(Declaration::parse("id, s bits(0)").is_err());
        assert!(Declaration::parse("id, s bytes(0)").is_err());
        assert!(Declaration::parse("id, s bytes(-4)").is_err());
        // over the size cap
        assert!(Declaration::parse("id, s bytes(257)").is_err());
        assert!(Declaration::parse("id, s bits(4096)").is_err());
        // unknown option
        assert!(Declaration::parse("id, s bits(64), OPT_FOR_SPEED").is_err());
        // malformed size spec
        assert!(Declaration::parse("id, s").is_err());
        assert!(Declaration::parse("id, s blobs(8)").is_err());
    }

    #[test]
    fn test_strategy_codes_roundtrip() {
        for s in [Strategy::Generic, Strategy::Subset, Strategy::Similarity] {
            assert_eq!(Strategy::from_u8(s as u8).unwrap(), s);
        }
        assert!(Strategy::from_u8(9).is_err());
    }
}
