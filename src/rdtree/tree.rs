// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The RD-tree index.
//!
//! A depth-balanced tree over fixed-size node pages. Leaves hold
//! `(rowid, fingerprint)` items; internal items hold a child node id, the
//! weight window of the subtree's leaves, the union of their fingerprints
//! (the envelope), and their maximum under the canonical order. Subset
//! and Tanimoto queries prune subtrees through those bounds.
//!
//! ## Structure
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │ RdTree<S: Storage>                                │
//! ├───────────────────────────────────────────────────┤
//! │ - store: S          node pages + mapping tables   │
//! │ - cache: NodeCache  pinned in-memory pages        │
//! │ - layout            sizes, capacity, min-fill     │
//! │ - strategy          split/descent distances       │
//! │ - depth             root-to-leaf level count      │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! - **Insert**: choose-leaf descent, sorted node insertion, node splits
//!   with strategy-driven item assignment, bound propagation toward the
//!   root, root split when the cascade reaches it
//! - **Delete**: locate the leaf via the rowid table, condense-tree
//!   (dissolve under-filled nodes, re-insert their items at their
//!   original height), root collapse when a single child remains
//! - **Search**: see [`crate::rdtree::cursor`]
//!
//! The bit- and weight-frequency tables track the stored rows only;
//! splits and condense re-insertions never touch them.

use super::cache::NodeCache;
use super::constraint::{subset_query, tanimoto_query};
use super::cursor::Cursor;
use super::item::Item;
use super::node::RdNode;
use super::types::{Declaration, NodeLayout, Strategy, DEFAULT_PAGE_SIZE, ROOT_NODE};
use crate::bfp::ops;
use crate::error::{FingerError, FingerResult};
use crate::metrics::QueryMetrics;
use crate::store::{FileStorage, Geometry, MemStorage, Storage};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Upper bound on the path length accepted when walking parent links;
/// anything longer indicates a corrupted parent table.
const MAX_PARENT_CHAIN: usize = 64;

/// Summary counters for one index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub rows: usize,
    pub nodes: usize,
    pub non_root_nodes: usize,
    pub depth: usize,
    pub bfp_bytes: usize,
    pub node_size: usize,
    pub node_capacity: usize,
    pub min_fill: usize,
    pub strategy: String,
}

/// An RD-tree index over a storage backend.
pub struct RdTree<S: Storage> {
    pub(crate) store: S,
    pub(crate) cache: NodeCache,
    pub(crate) layout: NodeLayout,
    pub(crate) strategy: Strategy,
    pub(crate) depth: usize,
    pub(crate) interrupt: Arc<AtomicBool>,
}

impl<S: Storage> std::fmt::Debug for RdTree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdTree")
            .field("layout", &self.layout)
            .field("strategy", &self.strategy)
            .field("depth", &self.depth)
            .field("rows", &self.store.rowid_count())
            .finish()
    }
}

impl RdTree<MemStorage> {
    /// Create an ephemeral in-memory index from a declaration such as
    /// `"id, s bits(1024), OPT_FOR_SUBSET_QUERIES"`.
    pub fn create_in_memory(decl: &str) -> FingerResult<Self> {
        let decl = Declaration::parse(decl)?;
        let layout = NodeLayout::new(decl.bfp_bytes, DEFAULT_PAGE_SIZE)?;
        let geometry = Geometry::new(decl.bfp_bytes, layout.node_size, decl.strategy);
        Self::open(MemStorage::create(geometry))
    }
}

impl RdTree<FileStorage> {
    /// Create a persistent index at `base` from a declaration.
    pub fn create_file<P: AsRef<Path>>(base: P, decl: &str) -> FingerResult<Self> {
        let decl = Declaration::parse(decl)?;
        let layout = NodeLayout::new(decl.bfp_bytes, DEFAULT_PAGE_SIZE)?;
        let geometry = Geometry::new(decl.bfp_bytes, layout.node_size, decl.strategy);
        Self::open(FileStorage::create(base, geometry)?)
    }

    /// Open an existing persistent index at `base`.
    pub fn open_file<P: AsRef<Path>>(base: P) -> FingerResult<Self> {
        Self::open(FileStorage::open(base)?)
    }
}

impl<S: Storage> RdTree<S> {
    /// Open an index over an initialised storage backend.
    ///
    /// ## Error Conditions
    /// - `ParseError`: the stored geometry is inconsistent
    /// - `CorruptedIndex`: the root page is missing, mis-sized, or claims
    ///   a depth an empty tree cannot have
    pub fn open(storage: S) -> FingerResult<Self> {
        let geometry = *storage.geometry();
        let layout = NodeLayout::from_node_size(geometry.bfp_bytes, geometry.node_size)?;
        let strategy = geometry.strategy()?;

        let root = storage
            .read_node(ROOT_NODE)?
            .ok_or_else(|| FingerError::CorruptedIndex {
                nodeid: ROOT_NODE,
                reason: "root page missing".to_string(),
            })?;
        if root.len() != layout.node_size {
            return Err(FingerError::CorruptedIndex {
                nodeid: ROOT_NODE,
                reason: format!(
                    "root page has {} bytes, geometry expects {}",
                    root.len(),
                    layout.node_size
                ),
            });
        }

        let depth = u16::from_be_bytes([root[0], root[1]]) as usize;
        let count = u16::from_be_bytes([root[2], root[3]]) as usize;
        if count == 0 && depth != 0 {
            return Err(FingerError::CorruptedIndex {
                nodeid: ROOT_NODE,
                reason: format!("empty root claims depth {}", depth),
            });
        }

        Ok(Self {
            store: storage,
            cache: NodeCache::new(),
            layout,
            strategy,
            depth,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Fingerprint size of this index, in bytes.
    pub fn bfp_bytes(&self) -> usize {
        self.layout.bfp_bytes
    }

    /// Current tree depth (0 while the root is the only node).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of stored rows.
    pub fn row_count(&self) -> usize {
        self.store.rowid_count()
    }

    /// The flag a host can set to interrupt a running scan.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Shared access to the storage backend.
    pub fn storage(&self) -> &S {
        &self.store
    }

    /// Summary counters.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            rows: self.store.rowid_count(),
            nodes: self.store.node_count(),
            non_root_nodes: self.store.parent_count(),
            depth: self.depth,
            bfp_bytes: self.layout.bfp_bytes,
            node_size: self.layout.node_size,
            node_capacity: self.layout.capacity,
            min_fill: self.layout.min_fill(),
            strategy: format!("{:?}", self.strategy),
        }
    }

    // -- writes ---------------------------------------------------------

    /// Insert a row.
    ///
    /// ## Input
    /// - `rowid`: explicit row identifier, or `None` to allocate the next
    ///   free one
    /// - `bfp`: the row's fingerprint
    ///
    /// ## Output
    /// - `Ok(rowid)`: the stored row's identifier
    ///
    /// ## Error Conditions
    /// - `LengthMismatch`: fingerprint size differs from the index
    /// - `RowidConflict`: an explicit rowid is already present
    pub fn insert(&mut self, rowid: Option<i64>, bfp: &[u8]) -> FingerResult<i64> {
        self.check_bfp(bfp)?;

        let rowid = match rowid {
            Some(explicit) => {
                if self.store.rowid_node(explicit)?.is_some() {
                    return Err(FingerError::RowidConflict { rowid: explicit });
                }
                explicit
            }
            None => self.store.alloc_rowid()?,
        };

        let item = Item::leaf(rowid, bfp.to_vec());
        self.insert_item_at(item, 0)?;
        self.increment_frequencies(bfp)?;
        self.store.flush()?;
        Ok(rowid)
    }

    /// Replace the fingerprint stored under `rowid`.
    ///
    /// ## Error Conditions
    /// - `RowidNotFound`: the rowid is not in the index
    /// - `LengthMismatch`: fingerprint size differs from the index
    pub fn update(&mut self, rowid: i64, bfp: &[u8]) -> FingerResult<()> {
        self.check_bfp(bfp)?;
        if self.store.rowid_node(rowid)?.is_none() {
            return Err(FingerError::RowidNotFound { rowid });
        }
        self.delete(rowid)?;
        self.insert(Some(rowid), bfp)?;
        Ok(())
    }

    /// Delete the row stored under `rowid`.
    ///
    /// Under-filled nodes along the path are dissolved and their items
    /// re-inserted at their original height; the root collapses while it
    /// holds a single child.
    ///
    /// ## Error Conditions
    /// - `RowidNotFound`: the rowid is not in the index
    /// - `CorruptedIndex`: the rowid table points at a leaf that does not
    ///   contain the rowid
    pub fn delete(&mut self, rowid: i64) -> FingerResult<()> {
        let leaf_id = self
            .store
            .rowid_node(rowid)?
            .ok_or(FingerError::RowidNotFound { rowid })?;

        let path = self.acquire_path_to(leaf_id)?;

        let located = (|| -> FingerResult<(usize, Item)> {
            let leaf = self.cache.node(leaf_id);
            let idx = leaf
                .rowid_index(rowid)
                .ok_or_else(|| FingerError::CorruptedIndex {
                    nodeid: leaf_id,
                    reason: format!("rowid {} not present in its leaf", rowid),
                })?;
            Ok((idx, leaf.get_item(idx)))
        })();

        let result = located.and_then(|(idx, removed)| {
            let mut orphans: Vec<(usize, RdNode)> = Vec::new();
            self.delete_and_condense(leaf_id, idx, &mut orphans)?;
            self.store.remove_rowid(rowid)?;
            self.shrink_root()?;
            self.reinsert_orphans(orphans)?;
            self.decrement_frequencies(&removed.bfp)
        });

        let released = self.release_path(&path);
        result.and(released)?;
        self.store.flush()
    }

    // -- queries --------------------------------------------------------

    /// Open a cursor over an optional constraint blob.
    ///
    /// Without a blob the cursor scans every row (diagnostic full scan).
    pub fn cursor(&mut self, blob: Option<&[u8]>) -> FingerResult<Cursor<'_, S>> {
        Cursor::new(self, blob)
    }

    /// Run a constraint blob to completion.
    pub fn search_with_metrics(
        &mut self,
        blob: Option<&[u8]>,
    ) -> FingerResult<(Vec<i64>, QueryMetrics)> {
        let mut cursor = Cursor::new(self, blob)?;
        let mut rows = Vec::new();
        while let Some(rowid) = cursor.next()? {
            rows.push(rowid);
        }
        let metrics = *cursor.metrics();
        drop(cursor);
        Ok((rows, metrics))
    }

    /// Rowids whose fingerprints contain `query` (substructure screen).
    pub fn search_subset(&mut self, query: &[u8]) -> FingerResult<Vec<i64>> {
        self.check_bfp(query)?;
        Ok(self.search_with_metrics(Some(&subset_query(query)))?.0)
    }

    /// Rowids whose fingerprints have `tanimoto >= threshold` to `query`.
    pub fn search_tanimoto(&mut self, query: &[u8], threshold: f64) -> FingerResult<Vec<i64>> {
        self.check_bfp(query)?;
        Ok(self
            .search_with_metrics(Some(&tanimoto_query(query, threshold)))?
            .0)
    }

    /// Every stored rowid, in traversal order.
    pub fn full_scan(&mut self) -> FingerResult<Vec<i64>> {
        Ok(self.search_with_metrics(None)?.0)
    }

    /// The fingerprint stored under `rowid`.
    pub fn row_bfp(&mut self, rowid: i64) -> FingerResult<Vec<u8>> {
        let leaf_id = self
            .store
            .rowid_node(rowid)?
            .ok_or(FingerError::RowidNotFound { rowid })?;

        self.cache.acquire(&self.store, leaf_id, 0, self.layout)?;
        let result = {
            let leaf = self.cache.node(leaf_id);
            leaf.rowid_index(rowid)
                .map(|idx| leaf.get_item(idx).bfp)
                .ok_or_else(|| FingerError::CorruptedIndex {
                    nodeid: leaf_id,
                    reason: format!("rowid {} not present in its leaf", rowid),
                })
        };
        let depth = self.depth;
        self.cache.release(&mut self.store, leaf_id, depth)?;
        result
    }

    // -- descent and insertion -----------------------------------------

    fn check_bfp(&self, bfp: &[u8]) -> FingerResult<()> {
        if bfp.len() != self.layout.bfp_bytes {
            return Err(FingerError::LengthMismatch {
                expected: self.layout.bfp_bytes,
                actual: bfp.len(),
            });
        }
        Ok(())
    }

    /// Descend from the root to the best node at `target_height`,
    /// scoring children with the index strategy. Returns the pinned path,
    /// root first.
    fn choose_leaf(&mut self, item: &Item, target_height: usize) -> FingerResult<Vec<i64>> {
        self.cache.acquire(&self.store, ROOT_NODE, 0, self.layout)?;
        let mut path = vec![ROOT_NODE];
        let mut current = ROOT_NODE;

        for _ in 0..self.depth.saturating_sub(target_height) {
            let best = {
                let node = self.cache.node(current);
                let mut best_id = 0;
                let mut best_score = (0.0, 0.0, 0.0);
                for idx in 0..node.count() {
                    let child = node.get_item(idx);
                    let score = self.strategy.choose_score(&child, item);
                    if idx == 0 || score < best_score {
                        best_score = score;
                        best_id = child.id;
                    }
                }
                best_id
            };
            self.cache.acquire(&self.store, best, current, self.layout)?;
            path.push(best);
            current = best;
        }

        Ok(path)
    }

    /// Insert an item at a given height through the standard descent,
    /// splitting on overflow. Frequencies are untouched; only top-level
    /// row operations own them.
    fn insert_item_at(&mut self, item: Item, height: usize) -> FingerResult<()> {
        let path = self.choose_leaf(&item, height)?;
        let target = *path.last().expect("path contains at least the root");
        let inserted = self.insert_into_node(target, &item, height);
        let released = self.release_path(&path);
        inserted.and(released)
    }

    /// Insert `item` into a pinned node, splitting when full and
    /// propagating bound changes toward the root.
    fn insert_into_node(&mut self, node_id: i64, item: &Item, height: usize) -> FingerResult<()> {
        if height > 0 {
            // the item points at a node; keep a resident child's parent
            // link accurate
            self.cache.set_parent(item.id, node_id);
        }

        let fits = self.cache.node_mut(node_id).insert_item(item);
        if fits {
            self.update_mapping(item.id, node_id, height)?;
            self.adjust_tree(node_id)
        } else {
            self.split_node(node_id, item, height)
        }
    }

    /// Split an overflowing node while inserting `item`.
    ///
    /// The node's items plus the incoming one are redistributed over two
    /// nodes by the strategy. A root split keeps node 1 as the (one item
    /// deeper) root; otherwise the left half reuses the node id and the
    /// sibling's cover item is inserted into the parent, cascading as
    /// needed.
    fn split_node(&mut self, node_id: i64, item: &Item, height: usize) -> FingerResult<()> {
        let is_root = node_id == ROOT_NODE;

        let (mut items, old_parent) = {
            let node = self.cache.node(node_id);
            (node.items(), node.parent)
        };
        items.push(item.clone());

        let new_parent = if is_root { ROOT_NODE } else { old_parent };
        let left_id = if is_root {
            self.store.alloc_nodeid()?
        } else {
            node_id
        };
        let right_id = self.store.alloc_nodeid()?;

        let mut left = RdNode::new(left_id, new_parent, self.layout);
        let mut right = RdNode::new(right_id, new_parent, self.layout);
        let (mut left_bounds, mut right_bounds) =
            self.strategy
                .assign_items(&items, &mut left, &mut right, self.layout.min_fill());
        left_bounds.id = left_id;
        right_bounds.id = right_id;

        if is_root {
            self.cache.adopt(left);
            self.cache.adopt(right);
            {
                let root = self.cache.node_mut(ROOT_NODE);
                root.zero();
                // the two cover items are appended in canonical order
                if ops::cmp(&left_bounds.max, &right_bounds.max) != std::cmp::Ordering::Greater {
                    root.append_item(&left_bounds);
                    root.append_item(&right_bounds);
                } else {
                    root.append_item(&right_bounds);
                    root.append_item(&left_bounds);
                }
            }
            self.depth += 1;
            self.store.set_parent_node(left_id, ROOT_NODE)?;
            self.store.set_parent_node(right_id, ROOT_NODE)?;
            self.update_node_mappings(left_id, height)?;
            self.update_node_mappings(right_id, height)?;
            let depth = self.depth;
            self.cache.release(&mut self.store, left_id, depth)?;
            self.cache.release(&mut self.store, right_id, depth)?;
        } else {
            self.cache.replace(left);
            self.cache.adopt(right);
            self.update_node_mappings(node_id, height)?;
            self.update_node_mappings(right_id, height)?;
            self.replace_parent_item(old_parent, node_id, &left_bounds)?;
            self.insert_into_node(old_parent, &right_bounds, height + 1)?;
            let depth = self.depth;
            self.cache.release(&mut self.store, right_id, depth)?;
        }

        Ok(())
    }

    /// Recompute parent cover items from `node_id` toward the root,
    /// stopping as soon as a level is already exact.
    fn adjust_tree(&mut self, node_id: i64) -> FingerResult<()> {
        let mut id = node_id;
        while id != ROOT_NODE {
            let (parent_id, bounds) = {
                let node = self.cache.node(id);
                (node.parent, Self::cover_item(node))
            };
            if !self.replace_parent_item(parent_id, id, &bounds)? {
                break;
            }
            id = parent_id;
        }
        Ok(())
    }

    /// The cover item describing `node` in its parent: envelope, weight
    /// window, and canonical maximum over the node's items.
    fn cover_item(node: &RdNode) -> Item {
        debug_assert!(node.count() > 0);
        let mut bounds = node.get_item(0);
        for idx in 1..node.count() {
            bounds.extend_bounds(&node.get_item(idx));
        }
        bounds.id = node.nodeid;
        bounds
    }

    /// Overwrite the parent item pointing at `child_id` with `bounds`.
    ///
    /// Re-inserts rather than writing in place so the parent stays sorted
    /// when the cover's canonical maximum moved.
    ///
    /// ## Output
    /// - `Ok(true)`: the parent item changed
    /// - `Ok(false)`: it was already exact
    fn replace_parent_item(
        &mut self,
        parent_id: i64,
        child_id: i64,
        bounds: &Item,
    ) -> FingerResult<bool> {
        let parent = self.cache.node_mut(parent_id);
        let idx = parent
            .rowid_index(child_id)
            .ok_or_else(|| FingerError::CorruptedIndex {
                nodeid: parent_id,
                reason: format!("no item for child node {}", child_id),
            })?;

        if parent.get_item(idx) == *bounds {
            return Ok(false);
        }
        parent.delete_item(idx);
        let inserted = parent.insert_item(bounds);
        debug_assert!(inserted, "re-insert into parent cannot overflow");
        Ok(true)
    }

    /// Record where an item lives: the rowid table for leaf items, the
    /// parent table (and any resident cached node) for child pointers.
    fn update_mapping(&mut self, id: i64, nodeid: i64, height: usize) -> FingerResult<()> {
        if height == 0 {
            self.store.set_rowid_node(id, nodeid)
        } else {
            self.cache.set_parent(id, nodeid);
            self.store.set_parent_node(id, nodeid)
        }
    }

    /// Refresh the mappings of every item in a node after a split moved
    /// items between pages.
    fn update_node_mappings(&mut self, nodeid: i64, height: usize) -> FingerResult<()> {
        let ids: Vec<i64> = {
            let node = self.cache.node(nodeid);
            (0..node.count()).map(|idx| node.item_id(idx)).collect()
        };
        for id in ids {
            self.update_mapping(id, nodeid, height)?;
        }
        Ok(())
    }

    /// Release a pinned path, leaf first. Nodes dissolved by
    /// condense-tree are already gone and are skipped.
    fn release_path(&mut self, path: &[i64]) -> FingerResult<()> {
        for &id in path.iter().rev() {
            if self.cache.contains(id) {
                let depth = self.depth;
                self.cache.release(&mut self.store, id, depth)?;
            }
        }
        Ok(())
    }

    // -- deletion -------------------------------------------------------

    /// Pin the chain from the root down to `leaf_id`, using the parent
    /// table to find the way up first.
    fn acquire_path_to(&mut self, leaf_id: i64) -> FingerResult<Vec<i64>> {
        let mut chain = vec![leaf_id];
        let mut current = leaf_id;
        while current != ROOT_NODE {
            let parent =
                self.store
                    .parent_node(current)?
                    .ok_or_else(|| FingerError::CorruptedIndex {
                        nodeid: current,
                        reason: "missing parent link".to_string(),
                    })?;
            if chain.len() > MAX_PARENT_CHAIN || chain.contains(&parent) {
                return Err(FingerError::CorruptedIndex {
                    nodeid: current,
                    reason: "parent links form a cycle".to_string(),
                });
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();

        if chain.len() != self.depth + 1 {
            return Err(FingerError::CorruptedIndex {
                nodeid: leaf_id,
                reason: format!(
                    "leaf sits at depth {} but the root records {}",
                    chain.len() - 1,
                    self.depth
                ),
            });
        }

        self.cache.acquire(&self.store, ROOT_NODE, 0, self.layout)?;
        for pair in chain.windows(2) {
            self.cache.acquire(&self.store, pair[1], pair[0], self.layout)?;
        }
        Ok(chain)
    }

    /// Remove item `idx` from a node, then walk upward dissolving every
    /// node that fell under the minimum fill. Dissolved nodes are handed
    /// back with their height for re-insertion.
    fn delete_and_condense(
        &mut self,
        node_id: i64,
        idx: usize,
        orphans: &mut Vec<(usize, RdNode)>,
    ) -> FingerResult<()> {
        let mut id = node_id;
        let mut remove_idx = idx;
        let mut height = 0usize;

        loop {
            self.cache.node_mut(id).delete_item(remove_idx);

            if id == ROOT_NODE {
                break;
            }
            if self.cache.node(id).count() >= self.layout.min_fill() {
                self.adjust_tree(id)?;
                break;
            }

            // dissolve: unlink from the parent and queue the remaining
            // items for re-insertion
            let parent_id = self.cache.node(id).parent;
            let parent_idx =
                self.cache
                    .node(parent_id)
                    .rowid_index(id)
                    .ok_or_else(|| FingerError::CorruptedIndex {
                        nodeid: parent_id,
                        reason: format!("no item for child node {}", id),
                    })?;

            self.store.delete_node(id)?;
            self.store.remove_parent(id)?;
            let owned = self.cache.take(id).expect("dissolved node was pinned");
            orphans.push((height, owned));

            id = parent_id;
            remove_idx = parent_idx;
            height += 1;
        }

        Ok(())
    }

    /// Collapse the root while it holds a single child: the child's
    /// content becomes the root's and the tree loses one level.
    ///
    /// The copy keeps the root populated before any orphan re-insertion
    /// runs; a leaf-first re-insert could not descend through an empty
    /// root.
    fn shrink_root(&mut self) -> FingerResult<()> {
        while self.depth > 0 && self.cache.node(ROOT_NODE).count() == 1 {
            let child_id = self.cache.node(ROOT_NODE).item_id(0);
            self.cache
                .acquire(&self.store, child_id, ROOT_NODE, self.layout)?;
            let promoted = self.cache.node(child_id).items();

            {
                let root = self.cache.node_mut(ROOT_NODE);
                root.zero();
                for item in &promoted {
                    // the child was sorted, appends keep the order
                    root.append_item(item);
                }
            }

            self.store.delete_node(child_id)?;
            self.store.remove_parent(child_id)?;
            self.cache.take(child_id).expect("child just pinned");
            self.depth -= 1;

            // the promoted items now live in the root
            let height = self.depth;
            for item in &promoted {
                self.update_mapping(item.id, ROOT_NODE, height)?;
            }
        }
        Ok(())
    }

    /// Re-insert the items of dissolved nodes, leaves first, through the
    /// standard insertion path. Frequencies stay untouched: these rows
    /// never logically left the index.
    fn reinsert_orphans(&mut self, mut orphans: Vec<(usize, RdNode)>) -> FingerResult<()> {
        orphans.sort_by_key(|(height, _)| *height);
        for (height, node) in orphans {
            for item in node.items() {
                self.insert_item_at(item, height)?;
            }
        }
        Ok(())
    }

    // -- frequency upkeep ----------------------------------------------

    fn increment_frequencies(&mut self, bfp: &[u8]) -> FingerResult<()> {
        for (byteno, &byte) in bfp.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    self.store.increment_bit_freq(byteno * 8 + bit)?;
                }
            }
        }
        self.store.increment_weight_freq(ops::weight(bfp))
    }

    fn decrement_frequencies(&mut self, bfp: &[u8]) -> FingerResult<()> {
        for (byteno, &byte) in bfp.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    self.store.decrement_bit_freq(byteno * 8 + bit)?;
                }
            }
        }
        self.store.decrement_weight_freq(ops::weight(bfp))
    }
}
