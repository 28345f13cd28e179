// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Per-query metrics.
//!
//! The cursor counts its traversal work so callers can see how much of
//! the tree a constraint pruned. Values are returned alongside search
//! results; nothing is collected globally.

use serde::Serialize;

/// Traversal counters for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryMetrics {
    /// Nodes the cursor descended into.
    pub nodes_visited: u64,

    /// Internal items rejected by `test_internal` (pruned subtrees).
    pub subtrees_pruned: u64,

    /// Leaf items evaluated by `test_leaf`.
    pub leaves_tested: u64,

    /// Rows emitted.
    pub rows_matched: u64,

    /// Wall-clock duration of the scan, in microseconds.
    pub elapsed_us: u64,
}
