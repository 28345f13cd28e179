// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Storage backends for the RD-tree index.
//!
//! The tree persists through five logical tables, mirroring the schema a
//! relational host would create for an index `T`:
//!
//! ```text
//! T_node(nodeid PRIMARY KEY, data BLOB)        -- one fixed-size page per node
//! T_rowid(rowid PRIMARY KEY, nodeid)           -- leaf locator
//! T_parent(nodeid PRIMARY KEY, parentnode)     -- parent of non-root nodes
//! T_bitfreq(bitno PRIMARY KEY, freq)           -- per-bit leaf counts
//! T_weightfreq(weight PRIMARY KEY, freq)       -- per-popcount leaf counts
//! ```
//!
//! The [`Storage`] trait is the prepared-statement surface over those
//! tables: read/write/delete on the three maps plus increment/decrement on
//! the two frequency tables. Two backends are provided:
//!
//! - [`MemStorage`]: in-memory tables for tests and ephemeral indexes
//! - [`FileStorage`]: a memory-mapped node file with CRC32-protected
//!   slots and a bincode side-table file, held under an advisory
//!   single-writer lock
//!
//! Creating a backend performs the host `CREATE` work: the empty root page
//! (node id 1, depth 0, zero items) is installed and both frequency tables
//! are zeroed.

mod file;
mod lock;
mod mem;

#[cfg(test)]
#[path = "mem_test.rs"]
mod mem_test;


pub use file::FileStorage;
pub use lock::{acquire_lock, IndexLock};
pub use mem::MemStorage;

use crate::error::FingerResult;
use crate::rdtree::types::Strategy;
use serde::{Deserialize, Serialize};

/// Persisted index geometry.
///
/// Fixed at create time and reloaded on open; the node size determines the
/// per-node item capacity, and the strategy is constant for the lifetime
/// of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Stored fingerprint size in bytes.
    pub bfp_bytes: usize,

    /// Node page size in bytes.
    pub node_size: usize,

    /// Split/descent strategy code (see [`Strategy`]).
    pub strategy_code: u8,
}

impl Geometry {
    /// Build a geometry record.
    pub fn new(bfp_bytes: usize, node_size: usize, strategy: Strategy) -> Self {
        Self {
            bfp_bytes,
            node_size,
            strategy_code: strategy as u8,
        }
    }

    /// Decode the stored strategy.
    pub fn strategy(&self) -> FingerResult<Strategy> {
        Strategy::from_u8(self.strategy_code)
    }
}

/// The paged-table contract the tree runs against.
///
/// One method per host prepared statement, plus geometry access, id
/// allocation, and a flush point. Implementations must keep the frequency
/// tables sized to `8 * bfp_bytes` bits and `8 * bfp_bytes + 1` weights.
pub trait Storage {
    /// The index geometry this backend was created with.
    fn geometry(&self) -> &Geometry;

    // -- T_node ---------------------------------------------------------

    /// Read a node page. `Ok(None)` when no such node exists.
    fn read_node(&self, nodeid: i64) -> FingerResult<Option<Vec<u8>>>;

    /// Write (insert or replace) a node page.
    fn write_node(&mut self, nodeid: i64, data: &[u8]) -> FingerResult<()>;

    /// Delete a node page.
    fn delete_node(&mut self, nodeid: i64) -> FingerResult<()>;

    /// Allocate a fresh node id. Ids are monotone and never reused.
    fn alloc_nodeid(&mut self) -> FingerResult<i64>;

    /// Number of live node pages.
    fn node_count(&self) -> usize;

    // -- T_rowid --------------------------------------------------------

    /// Node id of the leaf holding `rowid`, if present.
    fn rowid_node(&self, rowid: i64) -> FingerResult<Option<i64>>;

    /// Insert or replace a rowid→node mapping.
    fn set_rowid_node(&mut self, rowid: i64, nodeid: i64) -> FingerResult<()>;

    /// Remove a rowid mapping.
    fn remove_rowid(&mut self, rowid: i64) -> FingerResult<()>;

    /// Number of mapped rowids (== number of stored rows).
    fn rowid_count(&self) -> usize;

    /// Allocate a fresh rowid strictly above every rowid ever mapped.
    fn alloc_rowid(&mut self) -> FingerResult<i64>;

    // -- T_parent -------------------------------------------------------

    /// Parent of a non-root node, if recorded.
    fn parent_node(&self, nodeid: i64) -> FingerResult<Option<i64>>;

    /// Insert or replace a node→parent mapping.
    fn set_parent_node(&mut self, nodeid: i64, parentnode: i64) -> FingerResult<()>;

    /// Remove a node→parent mapping.
    fn remove_parent(&mut self, nodeid: i64) -> FingerResult<()>;

    /// Number of recorded parent links (== number of non-root nodes).
    fn parent_count(&self) -> usize;

    // -- T_bitfreq / T_weightfreq --------------------------------------

    /// `freq = freq + 1` for a bit position.
    fn increment_bit_freq(&mut self, bitno: usize) -> FingerResult<()>;

    /// `freq = freq - 1` for a bit position.
    fn decrement_bit_freq(&mut self, bitno: usize) -> FingerResult<()>;

    /// `freq = freq + 1` for a weight.
    fn increment_weight_freq(&mut self, weight: usize) -> FingerResult<()>;

    /// `freq = freq - 1` for a weight.
    fn decrement_weight_freq(&mut self, weight: usize) -> FingerResult<()>;

    /// Current frequency of a bit position.
    fn bit_freq(&self, bitno: usize) -> FingerResult<i64>;

    /// Current frequency of a weight.
    fn weight_freq(&self, weight: usize) -> FingerResult<i64>;

    // -- durability -----------------------------------------------------

    /// Persist auxiliary state. Called by the tree at the end of every
    /// public mutating operation, before the host would commit.
    fn flush(&mut self) -> FingerResult<()>;
}
