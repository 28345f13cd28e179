// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-memory node cache.
//!
//! Owns every live node page and hands out access keyed by node id.
//! Callers pin nodes with `acquire` and unpin with `release`; a dirty page
//! is written back through the storage backend when its last pin is
//! dropped, and the tree depth is stamped into the root page header on
//! write-back. A node is only ever mutated while pinned.
//!
//! Parent links between cached nodes are held as node ids, never as
//! pointers; tree operations keep whole root-to-leaf paths pinned while
//! they work, so a node's parent is always resident when needed.

use super::node::RdNode;
use super::types::{NodeLayout, ROOT_NODE};
use crate::error::{FingerError, FingerResult};
use crate::store::Storage;
use std::collections::HashMap;

struct Entry {
    node: RdNode,
    pins: usize,
}

/// Pin-counted cache of node pages.
pub struct NodeCache {
    entries: HashMap<i64, Entry>,
}

impl NodeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Number of cached (pinned) nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `nodeid` is resident.
    pub fn contains(&self, nodeid: i64) -> bool {
        self.entries.contains_key(&nodeid)
    }

    /// Pin a node, reading it from storage on a miss.
    ///
    /// ## Input
    /// - `nodeid`: node to pin
    /// - `parent`: parent node id recorded on a fresh load (0 for the root)
    ///
    /// ## Error Conditions
    /// - `CorruptedIndex`: the node does not exist, its page has the wrong
    ///   size, or its item count exceeds the layout capacity
    pub fn acquire<S: Storage>(
        &mut self,
        store: &S,
        nodeid: i64,
        parent: i64,
        layout: NodeLayout,
    ) -> FingerResult<()> {
        if let Some(entry) = self.entries.get_mut(&nodeid) {
            entry.pins += 1;
            return Ok(());
        }

        let data = store
            .read_node(nodeid)?
            .ok_or_else(|| FingerError::CorruptedIndex {
                nodeid,
                reason: "node page missing from storage".to_string(),
            })?;
        if data.len() != layout.node_size {
            return Err(FingerError::CorruptedIndex {
                nodeid,
                reason: format!(
                    "node page has {} bytes, layout expects {}",
                    data.len(),
                    layout.node_size
                ),
            });
        }

        let node = RdNode::from_data(nodeid, parent, layout, data);
        if node.count() > layout.capacity {
            return Err(FingerError::CorruptedIndex {
                nodeid,
                reason: format!(
                    "item count {} exceeds capacity {}",
                    node.count(),
                    layout.capacity
                ),
            });
        }

        self.entries.insert(nodeid, Entry { node, pins: 1 });
        Ok(())
    }

    /// Insert a freshly created node, pinned once.
    pub fn adopt(&mut self, node: RdNode) {
        debug_assert!(!self.entries.contains_key(&node.nodeid));
        self.entries.insert(node.nodeid, Entry { node, pins: 1 });
    }

    /// Replace the content of a cached node, keeping its pin count.
    pub fn replace(&mut self, node: RdNode) {
        let entry = self
            .entries
            .get_mut(&node.nodeid)
            .expect("replace of uncached node");
        entry.node = node;
    }

    /// Shared access to a pinned node.
    pub fn node(&self, nodeid: i64) -> &RdNode {
        &self
            .entries
            .get(&nodeid)
            .expect("access to unpinned node")
            .node
    }

    /// Mutable access to a pinned node.
    pub fn node_mut(&mut self, nodeid: i64) -> &mut RdNode {
        &mut self
            .entries
            .get_mut(&nodeid)
            .expect("access to unpinned node")
            .node
    }

    /// Update the recorded parent of a cached node.
    ///
    /// No-op when the node is not resident; the storage-side parent table
    /// is maintained separately by the tree.
    pub fn set_parent(&mut self, nodeid: i64, parent: i64) {
        if let Some(entry) = self.entries.get_mut(&nodeid) {
            entry.node.parent = parent;
        }
    }

    /// Unpin a node, flushing on the final release.
    ///
    /// A dirty page is written back only at pin count 1; the root page
    /// gets the current tree depth stamped into its header first. The
    /// entry is evicted when the pin count reaches zero.
    pub fn release<S: Storage>(
        &mut self,
        store: &mut S,
        nodeid: i64,
        root_depth: usize,
    ) -> FingerResult<()> {
        let entry = self
            .entries
            .get_mut(&nodeid)
            .expect("release of unpinned node");

        if entry.pins == 1 && entry.node.is_dirty() {
            if nodeid == ROOT_NODE {
                entry.node.set_depth(root_depth);
            }
            store.write_node(nodeid, entry.node.data())?;
            entry.node.mark_clean();
        }

        entry.pins -= 1;
        if entry.pins == 0 {
            self.entries.remove(&nodeid);
        }
        Ok(())
    }

    /// Remove a node from the cache entirely, transferring ownership to
    /// the caller.
    ///
    /// Used by condense-tree when a node leaves the tree: the page will
    /// not be written back, its items are re-inserted elsewhere.
    pub fn take(&mut self, nodeid: i64) -> Option<RdNode> {
        self.entries.remove(&nodeid).map(|entry| entry.node)
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new()
    }
}
