// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Core types for the RD-tree index.
//!
//! Defines the index geometry (fingerprint size, item size, node size,
//! capacity), the split/descent strategy selector, and the parser for the
//! index declaration syntax.

use crate::error::{FingerError, FingerResult};

/// Maximum stored fingerprint size in bytes.
pub const MAX_BFP_BYTES: usize = 256;

/// Maximum number of items per node.
///
/// Node size is chosen at create time so that capacity never exceeds this,
/// keeping split cost bounded on hosts with large pages.
pub const MAX_NODE_CAPACITY: usize = 51;

/// Node id of the tree root. The root always exists, even when empty.
pub const ROOT_NODE: i64 = 1;

/// Host page size assumed when sizing nodes at create time.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Bytes reserved for host per-page overhead when sizing nodes.
pub const PAGE_OVERHEAD: usize = 64;

/// Split and descent strategy, fixed at index creation.
///
/// Selects the distance measures used by choose-leaf and node splitting:
///
/// - `Generic`: Tanimoto distance between envelopes, weight-window and
///   weight tie-breakers
/// - `Subset`: optimised for substructure screens (growth, then weight)
/// - `Similarity`: optimised for Tanimoto queries (weight distance first)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Strategy {
    Generic = 0,
    Subset = 1,
    Similarity = 2,
}

impl Strategy {
    /// Decode a strategy from its stored byte.
    pub fn from_u8(value: u8) -> FingerResult<Self> {
        match value {
            0 => Ok(Strategy::Generic),
            1 => Ok(Strategy::Subset),
            2 => Ok(Strategy::Similarity),
            other => Err(FingerError::ParseError {
                reason: format!("unknown strategy code: {}", other),
            }),
        }
    }
}

/// Index geometry derived from the fingerprint size.
///
/// ## Item wire format
/// ```text
/// Offset        | Size | Field
/// --------------|------|---------------------------------
/// 0             | 8    | id (rowid on leaves, child node id on internal)
/// 8             | 2    | min weight (u16 big-endian)
/// 10            | 2    | max weight (u16 big-endian)
/// 12            | B    | fingerprint (leaf value / subtree envelope)
/// 12 + B        | B    | subtree maximum under the canonical order
/// ```
///
/// ## Node layout
/// Bytes 0..2 hold the tree depth (meaningful on the root only), bytes
/// 2..4 the item count, then `capacity` packed item slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    /// Stored fingerprint size in bytes.
    pub bfp_bytes: usize,

    /// Bytes consumed per item slot.
    pub item_bytes: usize,

    /// Size of a node page in bytes.
    pub node_size: usize,

    /// Maximum number of items per node.
    pub capacity: usize,
}

impl NodeLayout {
    /// Derive the layout for a fingerprint size, sizing nodes for the
    /// given host page size.
    pub fn new(bfp_bytes: usize, page_size: usize) -> FingerResult<Self> {
        if bfp_bytes == 0 || bfp_bytes > MAX_BFP_BYTES {
            return Err(FingerError::ParseError {
                reason: format!(
                    "fingerprint size must be in 1..={} bytes, got {}",
                    MAX_BFP_BYTES, bfp_bytes
                ),
            });
        }
        let item_bytes = 8 + 2 + 2 + 2 * bfp_bytes;
        let mut node_size = page_size - PAGE_OVERHEAD;
        if 4 + item_bytes * MAX_NODE_CAPACITY < node_size {
            node_size = 4 + item_bytes * MAX_NODE_CAPACITY;
        }
        let capacity = (node_size - 4) / item_bytes;
        Ok(Self {
            bfp_bytes,
            item_bytes,
            node_size,
            capacity,
        })
    }

    /// Reconstruct the layout of an existing index from its stored node
    /// size.
    pub fn from_node_size(bfp_bytes: usize, node_size: usize) -> FingerResult<Self> {
        if bfp_bytes == 0 || bfp_bytes > MAX_BFP_BYTES {
            return Err(FingerError::ParseError {
                reason: format!(
                    "fingerprint size must be in 1..={} bytes, got {}",
                    MAX_BFP_BYTES, bfp_bytes
                ),
            });
        }
        let item_bytes = 8 + 2 + 2 + 2 * bfp_bytes;
        if node_size < 4 + 2 * item_bytes {
            return Err(FingerError::ParseError {
                reason: format!("node size {} too small for two items", node_size),
            });
        }
        Ok(Self {
            bfp_bytes,
            item_bytes,
            node_size,
            capacity: (node_size - 4) / item_bytes,
        })
    }

    /// Minimum item count for non-root nodes: `⌈capacity / 3⌉`.
    pub fn min_fill(&self) -> usize {
        self.capacity.div_ceil(3)
    }
}

/// Parsed index declaration.
///
/// The declaration names the rowid column, the fingerprint column with its
/// width, and optionally a strategy hint:
///
/// ```text
/// id, s bits(1024)
/// id, s bytes(64), OPT_FOR_SUBSET_QUERIES
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Name of the integer id column.
    pub id_column: String,

    /// Name of the fingerprint column.
    pub bfp_column: String,

    /// Stored fingerprint size in bytes.
    pub bfp_bytes: usize,

    /// Split/descent strategy selected by the trailing option.
    pub strategy: Strategy,
}

impl Declaration {
    /// Parse an index declaration.
    ///
    /// ## Input
    /// - `decl`: comma-separated declaration, two column specs plus an
    ///   optional `OPT_FOR_SUBSET_QUERIES` / `OPT_FOR_SIMILARITY_QUERIES`
    ///
    /// ## Output
    /// - `Ok(Declaration)`: validated declaration
    /// - `Err(FingerError::ParseError)`: wrong arity, malformed size spec,
    ///   `bits(N)` with `N % 8 != 0`, size out of range, unknown option
    pub fn parse(decl: &str) -> FingerResult<Self> {
        let parts: Vec<&str> = decl.split(',').map(str::trim).collect();
        if parts.len() < 2 {
            return Err(FingerError::ParseError {
                reason: "two column definitions are required".to_string(),
            });
        }
        if parts.len() > 3 {
            return Err(FingerError::ParseError {
                reason: "at most one optional argument is expected".to_string(),
            });
        }

        let id_column = parts[0].to_string();
        if id_column.is_empty() || !id_column.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(FingerError::ParseError {
                reason: format!("invalid id column name: '{}'", parts[0]),
            });
        }

        let (bfp_column, bfp_bytes) = parse_bfp_column(parts[1])?;

        let strategy = match parts.get(2) {
            None => Strategy::Generic,
            Some(&"OPT_FOR_SUBSET_QUERIES") => Strategy::Subset,
            Some(&"OPT_FOR_SIMILARITY_QUERIES") => Strategy::Similarity,
            Some(other) => {
                return Err(FingerError::ParseError {
                    reason: format!("unrecognized option: {}", other),
                });
            }
        };

        Ok(Self {
            id_column,
            bfp_column,
            bfp_bytes,
            strategy,
        })
    }
}

/// Parse a `"name bits(N)"` or `"name bytes(N)"` column spec.
fn parse_bfp_column(spec: &str) -> FingerResult<(String, usize)> {
    let mut tokens = spec.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_string();
    let rest: String = tokens.collect::<Vec<_>>().join(" ");

    let (size_str, is_bits) = if let Some(inner) = strip_call(&rest, "bits") {
        (inner, true)
    } else if let Some(inner) = strip_call(&rest, "bytes") {
        (inner, false)
    } else {
        return Err(FingerError::ParseError {
            reason: format!("unable to parse the fingerprint size from: '{}'", spec),
        });
    };

    let size: i64 = size_str.trim().parse().map_err(|_| FingerError::ParseError {
        reason: format!("invalid fingerprint size: '{}'", size_str.trim()),
    })?;

    let bfp_bytes = if is_bits {
        if size <= 0 || size % 8 != 0 {
            return Err(FingerError::ParseError {
                reason: format!("invalid number of bits for a stored fingerprint: '{}'", size),
            });
        }
        (size / 8) as usize
    } else {
        if size <= 0 {
            return Err(FingerError::ParseError {
                reason: format!(
                    "invalid number of bytes for a stored fingerprint: '{}'",
                    size
                ),
            });
        }
        size as usize
    };

    if bfp_bytes > MAX_BFP_BYTES {
        return Err(FingerError::ParseError {
            reason: format!(
                "the requested fingerprint size exceeds the supported max value: {} bytes",
                MAX_BFP_BYTES
            ),
        });
    }

    Ok((name, bfp_bytes))
}

/// Strip `keyword ( inner )` from a spec tail, returning `inner`.
fn strip_call<'a>(rest: &'a str, keyword: &str) -> Option<&'a str> {
    let after = rest.strip_prefix(keyword)?.trim_start();
    let inner = after.strip_prefix('(')?.trim_end();
    inner.strip_suffix(')')
}
