// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-memory storage backend.
//!
//! Keeps the five index tables in plain maps and vectors. Used by the unit
//! tests and for ephemeral indexes; shares creation semantics with the
//! file backend (root page installed, frequency tables zeroed).

use super::{Geometry, Storage};
use crate::error::{FingerError, FingerResult};
use crate::rdtree::types::ROOT_NODE;
use std::collections::HashMap;

/// In-memory index tables.
#[derive(Debug)]
pub struct MemStorage {
    geometry: Geometry,
    nodes: HashMap<i64, Vec<u8>>,
    rowid_node: HashMap<i64, i64>,
    parent_node: HashMap<i64, i64>,
    bit_freq: Vec<i64>,
    weight_freq: Vec<i64>,
    next_nodeid: i64,
    next_rowid: i64,
}

impl MemStorage {
    /// Create a fresh index store: empty root page, zeroed frequencies.
    pub fn create(geometry: Geometry) -> Self {
        let nbits = 8 * geometry.bfp_bytes;
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_NODE, vec![0u8; geometry.node_size]);
        Self {
            geometry,
            nodes,
            rowid_node: HashMap::new(),
            parent_node: HashMap::new(),
            bit_freq: vec![0; nbits],
            weight_freq: vec![0; nbits + 1],
            next_nodeid: ROOT_NODE + 1,
            next_rowid: 1,
        }
    }
}

impl Storage for MemStorage {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn read_node(&self, nodeid: i64) -> FingerResult<Option<Vec<u8>>> {
        Ok(self.nodes.get(&nodeid).cloned())
    }

    fn write_node(&mut self, nodeid: i64, data: &[u8]) -> FingerResult<()> {
        debug_assert_eq!(data.len(), self.geometry.node_size);
        self.nodes.insert(nodeid, data.to_vec());
        Ok(())
    }

    fn delete_node(&mut self, nodeid: i64) -> FingerResult<()> {
        self.nodes.remove(&nodeid);
        Ok(())
    }

    fn alloc_nodeid(&mut self) -> FingerResult<i64> {
        let id = self.next_nodeid;
        self.next_nodeid += 1;
        Ok(id)
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn rowid_node(&self, rowid: i64) -> FingerResult<Option<i64>> {
        Ok(self.rowid_node.get(&rowid).copied())
    }

    fn set_rowid_node(&mut self, rowid: i64, nodeid: i64) -> FingerResult<()> {
        self.rowid_node.insert(rowid, nodeid);
        if rowid >= self.next_rowid {
            self.next_rowid = rowid + 1;
        }
        Ok(())
    }

    fn remove_rowid(&mut self, rowid: i64) -> FingerResult<()> {
        self.rowid_node.remove(&rowid);
        Ok(())
    }

    fn rowid_count(&self) -> usize {
        self.rowid_node.len()
    }

    fn alloc_rowid(&mut self) -> FingerResult<i64> {
        let id = self.next_rowid;
        self.next_rowid += 1;
        Ok(id)
    }

    fn parent_node(&self, nodeid: i64) -> FingerResult<Option<i64>> {
        Ok(self.parent_node.get(&nodeid).copied())
    }

    fn set_parent_node(&mut self, nodeid: i64, parentnode: i64) -> FingerResult<()> {
        self.parent_node.insert(nodeid, parentnode);
        Ok(())
    }

    fn remove_parent(&mut self, nodeid: i64) -> FingerResult<()> {
        self.parent_node.remove(&nodeid);
        Ok(())
    }

    fn parent_count(&self) -> usize {
        self.parent_node.len()
    }

    fn increment_bit_freq(&mut self, bitno: usize) -> FingerResult<()> {
        let slot = self.bit_freq.get_mut(bitno).ok_or_else(|| bit_range(bitno))?;
        *slot += 1;
        Ok(())
    }

    fn decrement_bit_freq(&mut self, bitno: usize) -> FingerResult<()> {
        let slot = self.bit_freq.get_mut(bitno).ok_or_else(|| bit_range(bitno))?;
        *slot -= 1;
        Ok(())
    }

    fn increment_weight_freq(&mut self, weight: usize) -> FingerResult<()> {
        let slot = self
            .weight_freq
            .get_mut(weight)
            .ok_or_else(|| weight_range(weight))?;
        *slot += 1;
        Ok(())
    }

    fn decrement_weight_freq(&mut self, weight: usize) -> FingerResult<()> {
        let slot = self
            .weight_freq
            .get_mut(weight)
            .ok_or_else(|| weight_range(weight))?;
        *slot -= 1;
        Ok(())
    }

    fn bit_freq(&self, bitno: usize) -> FingerResult<i64> {
        self.bit_freq.get(bitno).copied().ok_or_else(|| bit_range(bitno))
    }

    fn weight_freq(&self, weight: usize) -> FingerResult<i64> {
        self.weight_freq
            .get(weight)
            .copied()
            .ok_or_else(|| weight_range(weight))
    }

    fn flush(&mut self) -> FingerResult<()> {
        Ok(())
    }
}

fn bit_range(bitno: usize) -> FingerError {
    FingerError::CorruptedIndex {
        nodeid: 0,
        reason: format!("bit number {} outside frequency table", bitno),
    }
}

fn weight_range(weight: usize) -> FingerError {
    FingerError::CorruptedIndex {
        nodeid: 0,
        reason: format!("weight {} outside frequency table", weight),
    }
}
