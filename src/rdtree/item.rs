// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Node items.
//!
//! An item is the unit stored in a node slot. On a leaf it carries a rowid
//! and the row's fingerprint; on an internal node it carries a child node
//! id, the weight window of all descendant leaves, the bitwise union of
//! their fingerprints (the envelope), and their maximum under the
//! canonical order. Both shapes share one wire encoding; which one an item
//! is follows from the height of the node holding it.

use super::types::NodeLayout;
use crate::bfp::ops;

/// A deserialised node item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Rowid (leaf) or child node id (internal).
    pub id: i64,

    /// Smallest descendant fingerprint weight. Equals `max_weight` on
    /// leaves.
    pub min_weight: u16,

    /// Largest descendant fingerprint weight.
    pub max_weight: u16,

    /// Leaf fingerprint, or the union of all descendant leaf fingerprints.
    pub bfp: Vec<u8>,

    /// Maximum descendant fingerprint under the canonical order. Equals
    /// `bfp` on leaves.
    pub max: Vec<u8>,
}

impl Item {
    /// Build a leaf item for a row.
    ///
    /// The weight window collapses to the fingerprint's own weight and the
    /// subtree maximum is the fingerprint itself.
    pub fn leaf(rowid: i64, bfp: Vec<u8>) -> Self {
        let w = ops::weight(&bfp) as u16;
        let max = bfp.clone();
        Self {
            id: rowid,
            min_weight: w,
            max_weight: w,
            bfp,
            max,
        }
    }

    /// Weight of this item's fingerprint.
    pub fn weight(&self) -> usize {
        ops::weight(&self.bfp)
    }

    /// Distance between two items' weight windows.
    ///
    /// `|min_a − min_b| + |max_a − max_b|`, used by the similarity
    /// strategy and as a tie-breaker in the generic one.
    pub fn weight_distance(&self, other: &Item) -> f64 {
        let d1 = (i32::from(self.min_weight) - i32::from(other.min_weight)).abs();
        let d2 = (i32::from(self.max_weight) - i32::from(other.max_weight)).abs();
        f64::from(d1 + d2)
    }

    /// True when this item's bounds fully cover `other`'s.
    pub fn contains(&self, other: &Item) -> bool {
        self.min_weight <= other.min_weight
            && self.max_weight >= other.max_weight
            && ops::contains(&self.bfp, &other.bfp)
            && ops::cmp(&self.max, &other.max) != std::cmp::Ordering::Less
    }

    /// Number of envelope bits that adding `added` would newly set.
    pub fn growth(&self, added: &Item) -> usize {
        ops::growth(&self.bfp, &added.bfp)
    }

    /// Extend this item's bounds to also cover `added`.
    pub fn extend_bounds(&mut self, added: &Item) {
        ops::union_into(&mut self.bfp, &added.bfp);
        if self.min_weight > added.min_weight {
            self.min_weight = added.min_weight;
        }
        if self.max_weight < added.max_weight {
            self.max_weight = added.max_weight;
        }
        if ops::cmp(&self.max, &added.max) == std::cmp::Ordering::Less {
            self.max = added.max.clone();
        }
    }

    /// Serialise into an item slot.
    ///
    /// ## Input
    /// - `buf`: destination slot, exactly `layout.item_bytes` long
    pub fn write_to(&self, buf: &mut [u8], layout: &NodeLayout) {
        debug_assert_eq!(buf.len(), layout.item_bytes);
        debug_assert_eq!(self.bfp.len(), layout.bfp_bytes);
        debug_assert_eq!(self.max.len(), layout.bfp_bytes);

        let b = layout.bfp_bytes;
        buf[0..8].copy_from_slice(&self.id.to_be_bytes());
        buf[8..10].copy_from_slice(&self.min_weight.to_be_bytes());
        buf[10..12].copy_from_slice(&self.max_weight.to_be_bytes());
        buf[12..12 + b].copy_from_slice(&self.bfp);
        buf[12 + b..12 + 2 * b].copy_from_slice(&self.max);
    }

    /// Deserialise from an item slot.
    pub fn read_from(buf: &[u8], layout: &NodeLayout) -> Self {
        debug_assert_eq!(buf.len(), layout.item_bytes);

        let b = layout.bfp_bytes;
        Self {
            id: i64::from_be_bytes(buf[0..8].try_into().expect("8-byte id")),
            min_weight: u16::from_be_bytes(buf[8..10].try_into().expect("2-byte weight")),
            max_weight: u16::from_be_bytes(buf[10..12].try_into().expect("2-byte weight")),
            bfp: buf[12..12 + b].to_vec(),
            max: buf[12 + b..12 + 2 * b].to_vec(),
        }
    }
}
