// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for the in-memory storage backend.

use super::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdtree::types::{Strategy, ROOT_NODE};

    fn geometry() -> Geometry {
        Geometry::new(16, 4 + 44 * 10, Strategy::Generic)
    }

    #[test]
    fn test_create_installs_root_and_zeroed_freqs() {
        let store = MemStorage::create(geometry());
        let root = store.read_node(ROOT_NODE).unwrap().unwrap();
        assert_eq!(root.len(), geometry().node_size);
        assert!(root.iter().all(|&b| b == 0));
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.rowid_count(), 0);
        assert_eq!(store.parent_count(), 0);
        for bit in 0..128 {
            assert_eq!(store.bit_freq(bit).unwrap(), 0);
        }
        for weight in 0..=128 {
            assert_eq!(store.weight_freq(weight).unwrap(), 0);
        }
    }

    #[test]
    fn test_node_read_write_delete() {
        let mut store = MemStorage::create(geometry());
        let id = store.alloc_nodeid().unwrap();
        assert_eq!(id, ROOT_NODE + 1);
        assert!(store.read_node(id).unwrap().is_none());

        let page = vec![7u8; geometry().node_size];
        store.write_node(id, &page).unwrap();
        assert_eq!(store.read_node(id).unwrap().unwrap(), page);
        assert_eq!(store.node_count(), 2);

        store.delete_node(id).unwrap();
        assert!(store.read_node(id).unwrap().is_none());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_nodeids_are_monotone() {
        let mut store = MemStorage::create(geometry());
        let a = store.alloc_nodeid().unwrap();
        let b = store.alloc_nodeid().unwrap();
        store.delete_node(a).unwrap();
        let c = store.alloc_nodeid().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_rowid_mapping_and_allocation() {
        let mut store = MemStorage::create(geometry());
        assert_eq!(store.alloc_rowid().unwrap(), 1);

        store.set_rowid_node(100, ROOT_NODE).unwrap();
        assert_eq!(store.rowid_node(100).unwrap(), Some(ROOT_NODE));
        assert_eq!(store.rowid_count(), 1);

        // allocation never collides with an explicitly used rowid
        assert_eq!(store.alloc_rowid().unwrap(), 101);

        store.remove_rowid(100).unwrap();
        assert_eq!(store.rowid_node(100).unwrap(), None);
        // and does not reuse removed rowids
        assert_eq!(store.alloc_rowid().unwrap(), 102);
    }

    #[test]
    fn test_parent_mapping() {
        let mut store = MemStorage::create(geometry());
        store.set_parent_node(5, ROOT_NODE).unwrap();
        assert_eq!(store.parent_node(5).unwrap(), Some(ROOT_NODE));
        assert_eq!(store.parent_count(), 1);
        store.remove_parent(5).unwrap();
        assert_eq!(store.parent_node(5).unwrap(), None);
    }

    #[test]
    fn test_frequency_updates() {
        let mut store = MemStorage::create(geometry());
        store.increment_bit_freq(3).unwrap();
        store.increment_bit_freq(3).unwrap();
        store.decrement_bit_freq(3).unwrap();
        assert_eq!(store.bit_freq(3).unwrap(), 1);

        store.increment_weight_freq(128).unwrap();
        assert_eq!(store.weight_freq(128).unwrap(), 1);

        // out of range is a corruption error
        assert!(store.increment_bit_freq(128).is_err());
        assert!(store.increment_weight_freq(129).is_err());
        assert!(store.bit_freq(9999).is_err());
    }
}
