// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Match constraints.
//!
//! A query reaches the cursor as an opaque blob framed as
//!
//! ```text
//! u32 container magic | u32 kind magic | payload
//! ```
//!
//! with the query fingerprint (and, for Tanimoto, the threshold) as the
//! payload. Every constraint answers two questions during traversal:
//! `test_internal` (can the subtree under this item contain a match) and
//! `test_leaf` (does this row match).
//!
//! ## Subset
//! A row matches when its fingerprint is a superset of the query. A
//! subtree is pruned when its envelope does not contain the query (if the
//! query is not in the union of the descendants it is in none of them) or
//! when every descendant weighs less than the query.
//!
//! ## Tanimoto
//! A row matches when `tanimoto(row, q) ≥ τ`. Pruning uses three bounds:
//!
//! 1. weight window: a match must satisfy `τ·|q| ≤ |row| ≤ |q|/τ`
//! 2. bit filter: a match shares at least one bit with any subset of
//!    `⌈(1−τ)·|q|⌉ + 1` query bits; the filter picks the globally rarest
//!    ones from the bit-frequency table for maximum selectivity
//! 3. envelope bound: `|q ∩ env| / |q|` is an upper bound on the
//!    similarity of every descendant

use super::item::Item;
use crate::bfp::ops;
use crate::error::{FingerError, FingerResult};
use crate::store::Storage;

/// Container magic of every constraint blob.
pub const CONSTRAINT_MAGIC: u32 = 0x3DAF_12AB;

/// Kind magic of subset constraints.
pub const SUBSET_CONSTRAINT_MAGIC: u32 = 0x7C4F_9902;

/// Kind magic of Tanimoto constraints.
pub const TANIMOTO_CONSTRAINT_MAGIC: u32 = 0xF832_4B5E;

/// Build the match blob for a substructure (subset) screen.
pub fn subset_query(bfp: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(8 + bfp.len());
    blob.extend_from_slice(&CONSTRAINT_MAGIC.to_be_bytes());
    blob.extend_from_slice(&SUBSET_CONSTRAINT_MAGIC.to_be_bytes());
    blob.extend_from_slice(bfp);
    blob
}

/// Build the match blob for a Tanimoto similarity query.
///
/// The threshold is written in native byte order; the blob never crosses
/// a process boundary within a query.
pub fn tanimoto_query(bfp: &[u8], threshold: f64) -> Vec<u8> {
    let mut blob = Vec::with_capacity(8 + bfp.len() + 8);
    blob.extend_from_slice(&CONSTRAINT_MAGIC.to_be_bytes());
    blob.extend_from_slice(&TANIMOTO_CONSTRAINT_MAGIC.to_be_bytes());
    blob.extend_from_slice(bfp);
    blob.extend_from_slice(&threshold.to_ne_bytes());
    blob
}

/// A deserialised match constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    Subset(SubsetConstraint),
    Tanimoto(TanimotoConstraint),
}

/// Substructure screen: rows whose fingerprint contains the query.
#[derive(Debug, Clone)]
pub struct SubsetConstraint {
    bfp: Vec<u8>,
    weight: usize,
}

/// Similarity query: rows with `tanimoto(row, q) ≥ τ`.
#[derive(Debug, Clone)]
pub struct TanimotoConstraint {
    bfp: Vec<u8>,
    weight: usize,
    threshold: f64,
    filter: Vec<u8>,
}

impl Constraint {
    /// Deserialise a constraint blob.
    ///
    /// ## Input
    /// - `blob`: framed constraint bytes
    /// - `bfp_bytes`: fingerprint size of the index being queried
    ///
    /// ## Error Conditions
    /// - `ParseError`: blob too short, wrong container or kind magic
    /// - `LengthMismatch`: payload fingerprint does not match the index
    pub fn deserialize(blob: &[u8], bfp_bytes: usize) -> FingerResult<Self> {
        if blob.len() < 8 {
            return Err(FingerError::ParseError {
                reason: format!("constraint blob too short: {} bytes", blob.len()),
            });
        }

        let magic = u32::from_be_bytes(blob[0..4].try_into().expect("4 bytes"));
        if magic != CONSTRAINT_MAGIC {
            return Err(FingerError::ParseError {
                reason: format!(
                    "invalid constraint magic: expected 0x{:X}, got 0x{:X}",
                    CONSTRAINT_MAGIC, magic
                ),
            });
        }

        let kind = u32::from_be_bytes(blob[4..8].try_into().expect("4 bytes"));
        let payload = &blob[8..];

        match kind {
            SUBSET_CONSTRAINT_MAGIC => {
                if payload.len() != bfp_bytes {
                    return Err(FingerError::LengthMismatch {
                        expected: bfp_bytes,
                        actual: payload.len(),
                    });
                }
                Ok(Constraint::Subset(SubsetConstraint::new(payload.to_vec())))
            }
            TANIMOTO_CONSTRAINT_MAGIC => {
                if payload.len() != bfp_bytes + 8 {
                    return Err(FingerError::LengthMismatch {
                        expected: bfp_bytes + 8,
                        actual: payload.len(),
                    });
                }
                let bfp = payload[..bfp_bytes].to_vec();
                let threshold =
                    f64::from_ne_bytes(payload[bfp_bytes..].try_into().expect("8 bytes"));
                Ok(Constraint::Tanimoto(TanimotoConstraint::new(bfp, threshold)))
            }
            other => Err(FingerError::ParseError {
                reason: format!("unknown constraint kind: 0x{:X}", other),
            }),
        }
    }

    /// Serialise back into the framed blob form.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Constraint::Subset(c) => subset_query(&c.bfp),
            Constraint::Tanimoto(c) => tanimoto_query(&c.bfp, c.threshold),
        }
    }

    /// Prepare the constraint against the index it will run on.
    ///
    /// The Tanimoto constraint derives its bit filter from the global
    /// bit-frequency table here; the subset constraint needs no setup.
    pub fn initialize<S: Storage>(&mut self, store: &S) -> FingerResult<()> {
        match self {
            Constraint::Subset(_) => Ok(()),
            Constraint::Tanimoto(c) => c.build_filter(store),
        }
    }

    /// Can the subtree below `item` contain a matching row?
    pub fn test_internal(&self, item: &Item) -> bool {
        match self {
            Constraint::Subset(c) => c.test(item),
            Constraint::Tanimoto(c) => c.test_internal(item),
        }
    }

    /// Does the row described by the leaf `item` match?
    pub fn test_leaf(&self, item: &Item) -> bool {
        match self {
            Constraint::Subset(c) => c.test(item),
            Constraint::Tanimoto(c) => c.test_leaf(item),
        }
    }
}

impl SubsetConstraint {
    fn new(bfp: Vec<u8>) -> Self {
        let weight = ops::weight(&bfp);
        Self { bfp, weight }
    }

    /// Shared internal/leaf test.
    ///
    /// On internal items `bfp` is the union of the descendants, so a
    /// failed containment check rules out the whole subtree; the weight
    /// pre-check discards subtrees whose heaviest row is lighter than the
    /// query.
    fn test(&self, item: &Item) -> bool {
        if usize::from(item.max_weight) < self.weight {
            return false;
        }
        ops::contains(&item.bfp, &self.bfp)
    }
}

impl TanimotoConstraint {
    fn new(bfp: Vec<u8>, threshold: f64) -> Self {
        let weight = ops::weight(&bfp);
        let filter = vec![0u8; bfp.len()];
        Self {
            bfp,
            weight,
            threshold,
            filter,
        }
    }

    /// Number of filter bits: `⌈(1 − τ)·|q|⌉ + 1`, capped at `|q|`.
    fn filter_bits(&self) -> usize {
        let wanted = ((1.0 - self.threshold) * self.weight as f64).ceil() as usize + 1;
        wanted.min(self.weight)
    }

    /// Select the globally rarest query bits into the filter.
    ///
    /// A matching row must share at least one bit with any
    /// `⌈(1−τ)|q|⌉+1`-subset of the query; choosing the rarest bits per
    /// the frequency table maximises the pruning power. Frequency ties
    /// break by ascending bit number.
    fn build_filter(&mut self, store: &impl Storage) -> FingerResult<()> {
        self.filter.fill(0);

        let mut candidates: Vec<(i64, usize)> = Vec::with_capacity(self.weight);
        for (byteno, &byte) in self.bfp.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    let bitno = byteno * 8 + bit;
                    candidates.push((store.bit_freq(bitno)?, bitno));
                }
            }
        }

        candidates.sort_unstable();
        for &(_, bitno) in candidates.iter().take(self.filter_bits()) {
            self.filter[bitno / 8] |= 1 << (bitno % 8);
        }

        debug_assert_eq!(ops::weight(&self.filter), self.filter_bits());
        debug_assert!(ops::contains(&self.bfp, &self.filter));
        Ok(())
    }

    fn test_internal(&self, item: &Item) -> bool {
        let t = self.threshold;
        let na = self.weight as f64;

        // For tanimoto(q, b) >= t it must hold that t*|q| <= |b| <= |q|/t,
        // and the subtree's weights all lie in [min_weight, max_weight].
        if f64::from(item.max_weight) < t * na || na < t * f64::from(item.min_weight) {
            return false;
        }
        // A match shares at least one bit with the filter; if the union
        // of the descendants doesn't, none of them do.
        if !ops::intersects(&item.bfp, &self.filter) {
            return false;
        }
        // The envelope bounds the similarity of every descendant:
        // T = |q ∩ b| / |q ∪ b| <= |q ∩ env| / |q|
        ops::iweight(&item.bfp, &self.bfp) as f64 >= t * na
    }

    fn test_leaf(&self, item: &Item) -> bool {
        let t = self.threshold;
        let na = self.weight as f64;
        let nb = f64::from(item.max_weight); // on a leaf max == min

        if nb < t * na || na < t * nb {
            return false;
        }
        if !ops::intersects(&item.bfp, &self.filter) {
            return false;
        }

        let iweight = ops::iweight(&item.bfp, &self.bfp);
        let uweight = self.weight + usize::from(item.max_weight) - iweight;
        let similarity = if uweight != 0 {
            iweight as f64 / uweight as f64
        } else {
            1.0
        };
        similarity >= t
    }
}
