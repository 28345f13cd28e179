// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! FingerBase - embedded RD-tree index for binary chemical fingerprints.
//!
//! A disk-backed search index over fixed-width binary fingerprints (BFPs)
//! answering two classes of predicate queries by pruning instead of
//! scanning:
//!
//! - **Subset (substructure screen)**: rows whose fingerprint is a
//!   superset of the query
//! - **Tanimoto similarity**: rows whose fingerprint has
//!   `tanimoto >= threshold` to the query, with a bit-frequency-driven
//!   selectivity filter
//!
//! ## Quick Start
//!
//! ```rust
//! use fingerbase::bfp::bfp_dummy;
//! use fingerbase::rdtree::RdTree;
//!
//! // declare an index over 1024-bit fingerprints
//! let mut index = RdTree::create_in_memory("id, s bits(1024)")?;
//!
//! let a = index.insert(None, &bfp_dummy(1024, 0x0f))?;
//! let b = index.insert(None, &bfp_dummy(1024, 0xff))?;
//! index.insert(None, &bfp_dummy(1024, 0xf0))?;
//!
//! // substructure screen: everything containing 0x0f bits
//! let hits = index.search_subset(&bfp_dummy(1024, 0x0f))?;
//! assert_eq!(hits.len(), 2);
//! assert!(hits.contains(&a) && hits.contains(&b));
//!
//! // similarity: tanimoto >= 0.5 against the same query
//! let hits = index.search_tanimoto(&bfp_dummy(1024, 0x0f), 0.5)?;
//! assert_eq!(hits.len(), 2);
//! # Ok::<(), fingerbase::FingerError>(())
//! ```
//!
//! ## Architecture
//!
//! - **bfp**: the bit algebra (popcounts, containment, similarity, the
//!   canonical fingerprint order) and the scalar surface
//! - **rdtree**: items, nodes, the pin-counted cache, split strategies,
//!   match constraints, cursor, and the tree operations
//! - **store**: the paged-table contract plus in-memory and mmap-file
//!   backends
//! - **metrics**: per-query traversal counters
//!
//! Persistence keeps one fixed-size CRC32-protected page per node and
//! mirrors the auxiliary tables (rowid locator, parent links, bit and
//! weight frequencies) a relational host would hold next to them.

pub mod bfp;
pub mod error;
pub mod metrics;
pub mod rdtree;
pub mod store;

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

// Re-export commonly used types
pub use bfp::{bfp_dice, bfp_dummy, bfp_length, bfp_tanimoto, bfp_weight};
pub use error::{FingerError, FingerResult};
pub use metrics::QueryMetrics;
pub use rdtree::{subset_query, tanimoto_query, Cursor, IndexStats, RdTree, Strategy};
pub use store::{FileStorage, Geometry, MemStorage, Storage};
