// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The RD-tree: a disk-backed index over binary fingerprints.
//!
//! Organises fixed-width fingerprints so that subset (substructure
//! screen) and Tanimoto similarity queries prune large fractions of the
//! data instead of scanning it.
//!
//! ## Module Structure
//!
//! - `types`: geometry, strategy selector, declaration parsing
//! - `item`: the per-slot record (rowid/child id, weight window,
//!   envelope, canonical maximum)
//! - `node`: fixed-size pages of sorted items
//! - `cache`: pin-counted page cache with deterministic dirty flush
//! - `strategy`: the three split/descent strategies behind one loop
//! - `constraint`: subset and Tanimoto match constraints
//! - `cursor`: depth-first pruned traversal
//! - `tree`: insert, update, delete with condense-tree, search surface

pub mod cache;
pub mod constraint;
pub mod cursor;
pub mod item;
pub mod node;
pub mod strategy;
pub mod tree;
pub mod types;

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

#[cfg(test)]
#[path = "item_test.rs"]
mod item_test;




#[cfg(test)]
#[path = "constraint_test.rs"]
mod constraint_test;


// Re-export public API
pub use constraint::{subset_query, tanimoto_query, Constraint};
pub use cursor::Cursor;
pub use item::Item;
pub use tree::{IndexStats, RdTree};
pub use types::{Declaration, NodeLayout, Strategy, MAX_BFP_BYTES, ROOT_NODE};
