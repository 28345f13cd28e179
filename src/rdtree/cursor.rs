// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Query cursor.
//!
//! Depth-first traversal over the tree, pruning subtrees whose items fail
//! the constraint's internal test and emitting rowids whose leaf items
//! pass the exact test. Without a constraint the cursor degenerates to a
//! full scan.
//!
//! The cursor keeps its whole root-to-current path pinned as
//! `(node id, item index)` pairs, so ascending never re-reads a page. The
//! host interrupt flag is checked at the top of every step; pins are
//! dropped when the cursor goes out of scope.

use super::constraint::Constraint;
use super::tree::RdTree;
use crate::error::{FingerError, FingerResult};
use crate::metrics::QueryMetrics;
use crate::rdtree::types::ROOT_NODE;
use crate::store::Storage;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// A depth-first scan over one index.
pub struct Cursor<'a, S: Storage> {
    tree: &'a mut RdTree<S>,
    constraint: Option<Constraint>,
    /// Pinned path; each entry is a node and the next item index to visit.
    stack: Vec<(i64, usize)>,
    current: Option<i64>,
    metrics: QueryMetrics,
    started: Instant,
    done: bool,
}

impl<'a, S: Storage> Cursor<'a, S> {
    /// Open a cursor, deserialising and initialising the constraint blob
    /// if one is given.
    pub(crate) fn new(tree: &'a mut RdTree<S>, blob: Option<&[u8]>) -> FingerResult<Self> {
        let constraint = match blob {
            Some(bytes) => {
                let mut constraint = Constraint::deserialize(bytes, tree.layout.bfp_bytes)?;
                constraint.initialize(&tree.store)?;
                Some(constraint)
            }
            None => None,
        };

        tree.cache.acquire(&tree.store, ROOT_NODE, 0, tree.layout)?;

        Ok(Self {
            tree,
            constraint,
            stack: vec![(ROOT_NODE, 0)],
            current: None,
            metrics: QueryMetrics {
                nodes_visited: 1,
                ..QueryMetrics::default()
            },
            started: Instant::now(),
            done: false,
        })
    }

    /// Advance to the next matching row.
    ///
    /// ## Output
    /// - `Ok(Some(rowid))`: a matching row
    /// - `Ok(None)`: scan exhausted
    /// - `Err(FingerError::Interrupted)`: the host interrupt flag was set
    pub fn next(&mut self) -> FingerResult<Option<i64>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if self.tree.interrupt.load(Ordering::Relaxed) {
                return Err(FingerError::Interrupted);
            }

            let Some(&(node_id, idx)) = self.stack.last() else {
                self.done = true;
                self.finish_metrics();
                return Ok(None);
            };

            let tree = &mut *self.tree;
            if idx >= tree.cache.node(node_id).count() {
                // ascend
                self.stack.pop();
                tree.cache.release(&mut tree.store, node_id, tree.depth)?;
                if let Some(top) = self.stack.last_mut() {
                    top.1 += 1;
                }
                continue;
            }

            let item = tree.cache.node(node_id).get_item(idx);
            let at_leaf = self.stack.len() - 1 == tree.depth;

            if at_leaf {
                self.metrics.leaves_tested += 1;
                let accepted = match &self.constraint {
                    Some(constraint) => constraint.test_leaf(&item),
                    None => true,
                };
                self.stack.last_mut().expect("leaf frame").1 += 1;
                if accepted {
                    self.metrics.rows_matched += 1;
                    self.current = Some(item.id);
                    self.finish_metrics();
                    return Ok(Some(item.id));
                }
            } else {
                let descend = match &self.constraint {
                    Some(constraint) => constraint.test_internal(&item),
                    None => true,
                };
                if descend {
                    tree.cache.acquire(&tree.store, item.id, node_id, tree.layout)?;
                    self.metrics.nodes_visited += 1;
                    self.stack.push((item.id, 0));
                } else {
                    self.metrics.subtrees_pruned += 1;
                    self.stack.last_mut().expect("internal frame").1 += 1;
                }
            }
        }
    }

    /// Rowid of the row the cursor currently points at.
    pub fn rowid(&self) -> Option<i64> {
        self.current
    }

    /// True once the scan is exhausted.
    pub fn eof(&self) -> bool {
        self.done
    }

    /// Traversal counters so far.
    pub fn metrics(&self) -> &QueryMetrics {
        &self.metrics
    }

    fn finish_metrics(&mut self) {
        self.metrics.elapsed_us = self.started.elapsed().as_micros() as u64;
    }
}

impl<S: Storage> Drop for Cursor<'_, S> {
    fn drop(&mut self) {
        // unpin whatever is left of the path; pages are clean, so a
        // failed release cannot lose data
        let tree = &mut *self.tree;
        for &(node_id, _) in self.stack.iter().rev() {
            let _ = tree.cache.release(&mut tree.store, node_id, tree.depth);
        }
        self.stack.clear();
    }
}
