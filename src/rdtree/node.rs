// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! RD-tree node pages.
//!
//! The root node always exists, even when the index is empty, and its node
//! id is always 1. All nodes share one fixed size. The content of each
//! node is formatted as follows:
//!
//! 1. If the node is the root, the first 2 bytes contain the tree depth as
//!    a big-endian integer. For non-root nodes they are unused.
//! 2. The next 2 bytes contain the number of items currently stored.
//! 3. The remainder holds the packed item slots, kept sorted ascending by
//!    the canonical order of their `max` fingerprints. Each slot is a
//!    64-bit integer (rowid for leaves, child node id for internal nodes)
//!    followed by the weight window and the two fingerprints.
//!
//! Nodes track a dirty flag; the cache writes dirty pages back when the
//! last pin is released.

use super::item::Item;
use super::types::{NodeLayout, ROOT_NODE};
use crate::bfp::ops;

/// An in-memory node page.
#[derive(Debug, Clone)]
pub struct RdNode {
    /// Node id; 1 is the root.
    pub nodeid: i64,

    /// Parent node id, 0 for the root.
    pub parent: i64,

    layout: NodeLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl RdNode {
    /// Create an empty node bound to a parent.
    pub fn new(nodeid: i64, parent: i64, layout: NodeLayout) -> Self {
        Self {
            nodeid,
            parent,
            layout,
            data: vec![0u8; layout.node_size],
            dirty: true,
        }
    }

    /// Rebuild a node from its stored page.
    pub fn from_data(nodeid: i64, parent: i64, layout: NodeLayout, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), layout.node_size);
        Self {
            nodeid,
            parent,
            layout,
            data,
            dirty: false,
        }
    }

    /// Raw page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The layout this node was built with.
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Tree depth stored in the page header.
    ///
    /// Only meaningful on the root node.
    pub fn depth(&self) -> usize {
        debug_assert_eq!(self.nodeid, ROOT_NODE);
        u16::from_be_bytes([self.data[0], self.data[1]]) as usize
    }

    /// Stamp the tree depth into the page header (root only).
    pub fn set_depth(&mut self, depth: usize) {
        self.data[0..2].copy_from_slice(&(depth as u16).to_be_bytes());
        self.dirty = true;
    }

    /// Number of items currently stored.
    pub fn count(&self) -> usize {
        u16::from_be_bytes([self.data[2], self.data[3]]) as usize
    }

    fn set_count(&mut self, count: usize) {
        self.data[2..4].copy_from_slice(&(count as u16).to_be_bytes());
        self.dirty = true;
    }

    /// True when the page must be written back before eviction.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful write-back.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Clear the node content (depth header bytes excluded).
    pub fn zero(&mut self) {
        for byte in &mut self.data[2..] {
            *byte = 0;
        }
        self.dirty = true;
    }

    fn slot(&self, idx: usize) -> &[u8] {
        let start = 4 + self.layout.item_bytes * idx;
        &self.data[start..start + self.layout.item_bytes]
    }

    /// Deserialise item `idx`.
    pub fn get_item(&self, idx: usize) -> Item {
        debug_assert!(idx < self.count());
        Item::read_from(self.slot(idx), &self.layout)
    }

    /// All items of this node, in slot order.
    pub fn items(&self) -> Vec<Item> {
        (0..self.count()).map(|idx| self.get_item(idx)).collect()
    }

    /// The 64-bit id of item `idx` (rowid on leaves, child node id on
    /// internal nodes).
    pub fn item_id(&self, idx: usize) -> i64 {
        debug_assert!(idx < self.count());
        let start = 4 + self.layout.item_bytes * idx;
        i64::from_be_bytes(self.data[start..start + 8].try_into().expect("8-byte id"))
    }

    /// Max weight bound of item `idx`.
    pub fn item_max_weight(&self, idx: usize) -> u16 {
        debug_assert!(idx < self.count());
        let start = 4 + self.layout.item_bytes * idx + 10;
        u16::from_be_bytes(self.data[start..start + 2].try_into().expect("2-byte weight"))
    }

    /// Overwrite item slot `idx` with `item`.
    pub fn overwrite_item(&mut self, idx: usize, item: &Item) {
        let start = 4 + self.layout.item_bytes * idx;
        let end = start + self.layout.item_bytes;
        item.write_to(&mut self.data[start..end], &self.layout);
        self.dirty = true;
    }

    /// Insert `item`, preserving the ordering by canonical `max`.
    ///
    /// ## Output
    /// - `true`: inserted
    /// - `false`: the node is full; the caller must split
    pub fn insert_item(&mut self, item: &Item) -> bool {
        let count = self.count();
        debug_assert!(count <= self.layout.capacity);

        if count == self.layout.capacity {
            return false;
        }

        // insertion position: first slot whose max sorts >= the new item's
        let mut pos = count;
        for idx in 0..count {
            let b = self.layout.bfp_bytes;
            let start = 4 + self.layout.item_bytes * idx + 12 + b;
            let slot_max = &self.data[start..start + b];
            if ops::cmp(&item.max, slot_max) != std::cmp::Ordering::Greater {
                pos = idx;
                break;
            }
        }

        // shift the tail one slot forward
        let src = 4 + self.layout.item_bytes * pos;
        let bytes = (count - pos) * self.layout.item_bytes;
        self.data
            .copy_within(src..src + bytes, src + self.layout.item_bytes);

        self.overwrite_item(pos, item);
        self.set_count(count + 1);
        true
    }

    /// Append `item` without searching for its slot.
    ///
    /// The caller guarantees the append keeps the node ordered; used when
    /// assembling a node from items that are already sorted (a fresh root
    /// after a split, a promoted child during root collapse).
    ///
    /// ## Output
    /// - `true`: appended; `false`: the node is full
    pub fn append_item(&mut self, item: &Item) -> bool {
        let count = self.count();
        debug_assert!(count <= self.layout.capacity);

        if count == self.layout.capacity {
            return false;
        }
        self.overwrite_item(count, item);
        self.set_count(count + 1);
        true
    }

    /// Remove item `idx`, shifting the tail left.
    pub fn delete_item(&mut self, idx: usize) {
        let count = self.count();
        debug_assert!(idx < count);

        let dst = 4 + self.layout.item_bytes * idx;
        let src = dst + self.layout.item_bytes;
        let bytes = (count - idx - 1) * self.layout.item_bytes;
        self.data.copy_within(src..src + bytes, dst);
        // clear the vacated tail slot
        let tail = 4 + self.layout.item_bytes * (count - 1);
        self.data[tail..tail + self.layout.item_bytes].fill(0);
        self.set_count(count - 1);
    }

    /// Index of the item whose id equals `id`.
    ///
    /// Linear scan; nodes are sorted by fingerprint, not id.
    pub fn rowid_index(&self, id: i64) -> Option<usize> {
        (0..self.count()).find(|&idx| self.item_id(idx) == id)
    }
}
