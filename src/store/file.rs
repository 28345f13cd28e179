// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! File-backed storage with memory-mapped node pages.
//!
//! An index at base path `idx` occupies three files:
//!
//! ```text
//! idx.nodes   fixed-size slots, one per node page, mmap I/O
//! idx.meta    bincode side tables (rowid/parent maps, frequencies)
//! idx.lock    advisory single-writer lock
//! ```
//!
//! ## Node file layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ FileHeader (16 bytes)                        │
//! ├──────────────────────────────────────────────┤
//! │ Slot 1: SlotHeader (16) + node page (P)      │
//! │ Slot 2: SlotHeader (16) + node page (P)      │
//! │ ...                                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Node id `k` lives in slot `k`; ids are allocated monotonically and
//! never reused, so a deleted slot simply stays vacant. Every occupied
//! slot carries a CRC32 of its page, validated on read.
//!
//! ## Meta file
//! The four auxiliary tables plus the geometry and id counters are
//! serialised with bincode behind a magic prefix and a CRC32 trailer. The
//! file is rewritten by `flush()`, which the tree calls at the end of
//! every public mutating operation.

use super::lock::{acquire_lock, IndexLock};
use super::{Geometry, Storage};
use crate::error::{FingerError, FingerResult};
use crate::rdtree::types::ROOT_NODE;
use memmap2::MmapMut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Magic bytes of the node file.
const NODE_FILE_MAGIC: u32 = 0xFB0A_5E01;

/// Magic bytes of the meta file.
const META_FILE_MAGIC: u32 = 0xFB0A_5E02;

/// Node file format version.
const NODE_FILE_VERSION: u16 = 1;

/// Node file header size in bytes.
const FILE_HEADER_SIZE: usize = 16;

/// Per-slot header size in bytes.
const SLOT_HEADER_SIZE: usize = 16;

/// Slots added per file growth step.
const GROW_SLOTS: usize = 64;

/// Default wait for the single-writer lock.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Side tables persisted in the meta file.
#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    geometry: Geometry,
    next_nodeid: i64,
    next_rowid: i64,
    rowid_node: BTreeMap<i64, i64>,
    parent_node: BTreeMap<i64, i64>,
    bit_freq: Vec<i64>,
    weight_freq: Vec<i64>,
}

/// File-backed index storage.
pub struct FileStorage {
    nodes_path: PathBuf,
    meta_path: PathBuf,
    file: File,
    mmap: MmapMut,
    meta: Meta,
    node_count: usize,
    #[allow(dead_code)]
    lock: IndexLock,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("nodes_path", &self.nodes_path)
            .field("geometry", &self.meta.geometry)
            .field("node_count", &self.node_count)
            .finish()
    }
}

impl FileStorage {
    /// Create a fresh index at `base` (producing `base.nodes`, `base.meta`,
    /// `base.lock`).
    ///
    /// ## Output
    /// - `Ok(FileStorage)`: root page installed, frequency tables zeroed
    /// - `Err(FingerError)`: the index already exists, lock contention, or
    ///   an I/O failure
    pub fn create<P: AsRef<Path>>(base: P, geometry: Geometry) -> FingerResult<Self> {
        let nodes_path = with_ext(base.as_ref(), "nodes");
        let meta_path = with_ext(base.as_ref(), "meta");
        let lock_path = with_ext(base.as_ref(), "lock");

        if nodes_path.exists() || meta_path.exists() {
            return Err(FingerError::IoError {
                operation: "create_index".to_string(),
                reason: format!("index files already exist at '{}'", base.as_ref().display()),
            });
        }

        let lock = acquire_lock(&lock_path, LOCK_TIMEOUT)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&nodes_path)
            .map_err(|e| FingerError::IoError {
                operation: "create_node_file".to_string(),
                reason: e.to_string(),
            })?;

        let slot_size = SLOT_HEADER_SIZE + geometry.node_size;
        let initial = FILE_HEADER_SIZE + GROW_SLOTS * slot_size;
        file.set_len(initial as u64).map_err(|e| FingerError::IoError {
            operation: "size_node_file".to_string(),
            reason: e.to_string(),
        })?;

        let mmap = unsafe {
            MmapMut::map_mut(&file).map_err(|e| FingerError::IoError {
                operation: "mmap_node_file".to_string(),
                reason: e.to_string(),
            })?
        };

        let nbits = 8 * geometry.bfp_bytes;
        let meta = Meta {
            geometry,
            next_nodeid: ROOT_NODE + 1,
            next_rowid: 1,
            rowid_node: BTreeMap::new(),
            parent_node: BTreeMap::new(),
            bit_freq: vec![0; nbits],
            weight_freq: vec![0; nbits + 1],
        };

        let mut storage = Self {
            nodes_path,
            meta_path,
            file,
            mmap,
            meta,
            node_count: 0,
            lock,
        };

        storage.write_file_header()?;
        // install the empty root page
        let root = vec![0u8; geometry.node_size];
        storage.write_node(ROOT_NODE, &root)?;
        storage.flush()?;

        Ok(storage)
    }

    /// Open an existing index at `base`.
    ///
    /// ## Error Conditions
    /// - Missing files, magic/version mismatch, meta CRC32 mismatch, node
    ///   size disagreement between the two files, lock contention
    pub fn open<P: AsRef<Path>>(base: P) -> FingerResult<Self> {
        let nodes_path = with_ext(base.as_ref(), "nodes");
        let meta_path = with_ext(base.as_ref(), "meta");
        let lock_path = with_ext(base.as_ref(), "lock");

        let lock = acquire_lock(&lock_path, LOCK_TIMEOUT)?;

        let meta = read_meta(&meta_path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&nodes_path)
            .map_err(|e| FingerError::IoError {
                operation: "open_node_file".to_string(),
                reason: e.to_string(),
            })?;

        let mmap = unsafe {
            MmapMut::map_mut(&file).map_err(|e| FingerError::IoError {
                operation: "mmap_node_file".to_string(),
                reason: e.to_string(),
            })?
        };

        let mut storage = Self {
            nodes_path,
            meta_path,
            file,
            mmap,
            meta,
            node_count: 0,
            lock,
        };
        storage.check_file_header()?;
        storage.node_count = storage.count_occupied_slots();

        Ok(storage)
    }

    fn write_file_header(&mut self) -> FingerResult<()> {
        self.mmap[0..4].copy_from_slice(&NODE_FILE_MAGIC.to_be_bytes());
        self.mmap[4..6].copy_from_slice(&NODE_FILE_VERSION.to_be_bytes());
        self.mmap[6..8].fill(0);
        self.mmap[8..12].copy_from_slice(&(self.meta.geometry.node_size as u32).to_be_bytes());
        self.mmap[12..16].fill(0);
        Ok(())
    }

    fn check_file_header(&self) -> FingerResult<()> {
        if self.mmap.len() < FILE_HEADER_SIZE {
            return Err(FingerError::CorruptedIndex {
                nodeid: 0,
                reason: "node file shorter than its header".to_string(),
            });
        }
        let magic = u32::from_be_bytes(self.mmap[0..4].try_into().expect("4 bytes"));
        if magic != NODE_FILE_MAGIC {
            return Err(FingerError::CorruptedIndex {
                nodeid: 0,
                reason: format!(
                    "invalid node file magic: expected 0x{:X}, got 0x{:X}",
                    NODE_FILE_MAGIC, magic
                ),
            });
        }
        let version = u16::from_be_bytes(self.mmap[4..6].try_into().expect("2 bytes"));
        if version != NODE_FILE_VERSION {
            return Err(FingerError::CorruptedIndex {
                nodeid: 0,
                reason: format!("unsupported node file version: {}", version),
            });
        }
        let node_size = u32::from_be_bytes(self.mmap[8..12].try_into().expect("4 bytes")) as usize;
        if node_size != self.meta.geometry.node_size {
            return Err(FingerError::CorruptedIndex {
                nodeid: 0,
                reason: format!(
                    "node size mismatch: meta says {}, node file says {}",
                    self.meta.geometry.node_size, node_size
                ),
            });
        }
        Ok(())
    }

    fn slot_size(&self) -> usize {
        SLOT_HEADER_SIZE + self.meta.geometry.node_size
    }

    fn slot_offset(&self, nodeid: i64) -> usize {
        FILE_HEADER_SIZE + (nodeid as usize - 1) * self.slot_size()
    }

    fn count_occupied_slots(&self) -> usize {
        let slot_size = self.slot_size();
        let mut count = 0;
        let mut offset = FILE_HEADER_SIZE;
        while offset + slot_size <= self.mmap.len() {
            let magic = u32::from_be_bytes(self.mmap[offset..offset + 4].try_into().expect("4"));
            if magic == NODE_FILE_MAGIC && self.mmap[offset + 4] == 1 {
                count += 1;
            }
            offset += slot_size;
        }
        count
    }

    /// Grow the node file (and remap) until `nodeid`'s slot fits.
    fn ensure_capacity(&mut self, nodeid: i64) -> FingerResult<()> {
        let required = self.slot_offset(nodeid) + self.slot_size();
        if required <= self.mmap.len() {
            return Ok(());
        }
        let mut new_len = self.mmap.len();
        while new_len < required {
            new_len += GROW_SLOTS * self.slot_size();
        }
        self.file
            .set_len(new_len as u64)
            .map_err(|e| FingerError::IoError {
                operation: "grow_node_file".to_string(),
                reason: e.to_string(),
            })?;
        self.mmap = unsafe {
            MmapMut::map_mut(&self.file).map_err(|e| FingerError::IoError {
                operation: "remap_node_file".to_string(),
                reason: e.to_string(),
            })?
        };
        Ok(())
    }
}

impl Storage for FileStorage {
    fn geometry(&self) -> &Geometry {
        &self.meta.geometry
    }

    fn read_node(&self, nodeid: i64) -> FingerResult<Option<Vec<u8>>> {
        if nodeid < ROOT_NODE {
            return Ok(None);
        }
        let offset = self.slot_offset(nodeid);
        let slot_size = self.slot_size();
        if offset + slot_size > self.mmap.len() {
            return Ok(None);
        }

        let magic = u32::from_be_bytes(self.mmap[offset..offset + 4].try_into().expect("4"));
        if magic != NODE_FILE_MAGIC || self.mmap[offset + 4] != 1 {
            return Ok(None);
        }

        let stored_crc =
            u32::from_be_bytes(self.mmap[offset + 8..offset + 12].try_into().expect("4"));
        let data_start = offset + SLOT_HEADER_SIZE;
        let data = &self.mmap[data_start..data_start + self.meta.geometry.node_size];
        let computed_crc = crc32fast::hash(data);
        if computed_crc != stored_crc {
            return Err(FingerError::CorruptedIndex {
                nodeid,
                reason: format!(
                    "CRC32 mismatch: expected 0x{:X}, computed 0x{:X}",
                    stored_crc, computed_crc
                ),
            });
        }

        Ok(Some(data.to_vec()))
    }

    fn write_node(&mut self, nodeid: i64, data: &[u8]) -> FingerResult<()> {
        debug_assert_eq!(data.len(), self.meta.geometry.node_size);
        self.ensure_capacity(nodeid)?;

        let offset = self.slot_offset(nodeid);
        let was_occupied = {
            let magic = u32::from_be_bytes(self.mmap[offset..offset + 4].try_into().expect("4"));
            magic == NODE_FILE_MAGIC && self.mmap[offset + 4] == 1
        };

        let crc = crc32fast::hash(data);
        self.mmap[offset..offset + 4].copy_from_slice(&NODE_FILE_MAGIC.to_be_bytes());
        self.mmap[offset + 4] = 1;
        self.mmap[offset + 5..offset + 8].fill(0);
        self.mmap[offset + 8..offset + 12].copy_from_slice(&crc.to_be_bytes());
        self.mmap[offset + 12..offset + 16].fill(0);
        let data_start = offset + SLOT_HEADER_SIZE;
        self.mmap[data_start..data_start + data.len()].copy_from_slice(data);

        self.mmap.flush().map_err(|e| FingerError::IoError {
            operation: "flush_node_write".to_string(),
            reason: e.to_string(),
        })?;

        if !was_occupied {
            self.node_count += 1;
        }
        Ok(())
    }

    fn delete_node(&mut self, nodeid: i64) -> FingerResult<()> {
        let offset = self.slot_offset(nodeid);
        if offset + self.slot_size() > self.mmap.len() {
            return Ok(());
        }
        let magic = u32::from_be_bytes(self.mmap[offset..offset + 4].try_into().expect("4"));
        if magic == NODE_FILE_MAGIC && self.mmap[offset + 4] == 1 {
            self.mmap[offset + 4] = 0;
            self.node_count -= 1;
            self.mmap.flush().map_err(|e| FingerError::IoError {
                operation: "flush_node_delete".to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn alloc_nodeid(&mut self) -> FingerResult<i64> {
        let id = self.meta.next_nodeid;
        self.meta.next_nodeid += 1;
        Ok(id)
    }

    fn node_count(&self) -> usize {
        self.node_count
    }

    fn rowid_node(&self, rowid: i64) -> FingerResult<Option<i64>> {
        Ok(self.meta.rowid_node.get(&rowid).copied())
    }

    fn set_rowid_node(&mut self, rowid: i64, nodeid: i64) -> FingerResult<()> {
        self.meta.rowid_node.insert(rowid, nodeid);
        if rowid >= self.meta.next_rowid {
            self.meta.next_rowid = rowid + 1;
        }
        Ok(())
    }

    fn remove_rowid(&mut self, rowid: i64) -> FingerResult<()> {
        self.meta.rowid_node.remove(&rowid);
        Ok(())
    }

    fn rowid_count(&self) -> usize {
        self.meta.rowid_node.len()
    }

    fn alloc_rowid(&mut self) -> FingerResult<i64> {
        let id = self.meta.next_rowid;
        self.meta.next_rowid += 1;
        Ok(id)
    }

    fn parent_node(&self, nodeid: i64) -> FingerResult<Option<i64>> {
        Ok(self.meta.parent_node.get(&nodeid).copied())
    }

    fn set_parent_node(&mut self, nodeid: i64, parentnode: i64) -> FingerResult<()> {
        self.meta.parent_node.insert(nodeid, parentnode);
        Ok(())
    }

    fn remove_parent(&mut self, nodeid: i64) -> FingerResult<()> {
        self.meta.parent_node.remove(&nodeid);
        Ok(())
    }

    fn parent_count(&self) -> usize {
        self.meta.parent_node.len()
    }

    fn increment_bit_freq(&mut self, bitno: usize) -> FingerResult<()> {
        let slot = self
            .meta
            .bit_freq
            .get_mut(bitno)
            .ok_or_else(|| freq_range("bit", bitno))?;
        *slot += 1;
        Ok(())
    }

    fn decrement_bit_freq(&mut self, bitno: usize) -> FingerResult<()> {
        let slot = self
            .meta
            .bit_freq
            .get_mut(bitno)
            .ok_or_else(|| freq_range("bit", bitno))?;
        *slot -= 1;
        Ok(())
    }

    fn increment_weight_freq(&mut self, weight: usize) -> FingerResult<()> {
        let slot = self
            .meta
            .weight_freq
            .get_mut(weight)
            .ok_or_else(|| freq_range("weight", weight))?;
        *slot += 1;
        Ok(())
    }

    fn decrement_weight_freq(&mut self, weight: usize) -> FingerResult<()> {
        let slot = self
            .meta
            .weight_freq
            .get_mut(weight)
            .ok_or_else(|| freq_range("weight", weight))?;
        *slot -= 1;
        Ok(())
    }

    fn bit_freq(&self, bitno: usize) -> FingerResult<i64> {
        self.meta
            .bit_freq
            .get(bitno)
            .copied()
            .ok_or_else(|| freq_range("bit", bitno))
    }

    fn weight_freq(&self, weight: usize) -> FingerResult<i64> {
        self.meta
            .weight_freq
            .get(weight)
            .copied()
            .ok_or_else(|| freq_range("weight", weight))
    }

    fn flush(&mut self) -> FingerResult<()> {
        self.mmap.flush().map_err(|e| FingerError::IoError {
            operation: "flush_node_file".to_string(),
            reason: e.to_string(),
        })?;
        write_meta(&self.meta_path, &self.meta)
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn with_ext(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn write_meta(path: &Path, meta: &Meta) -> FingerResult<()> {
    let body = bincode::serialize(meta).map_err(|e| FingerError::SerializationError {
        reason: e.to_string(),
    })?;

    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&META_FILE_MAGIC.to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());

    let mut file = File::create(path).map_err(|e| FingerError::IoError {
        operation: "write_meta".to_string(),
        reason: e.to_string(),
    })?;
    file.write_all(&out).map_err(|e| FingerError::IoError {
        operation: "write_meta".to_string(),
        reason: e.to_string(),
    })?;
    file.sync_all().map_err(|e| FingerError::IoError {
        operation: "sync_meta".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn read_meta(path: &Path) -> FingerResult<Meta> {
    let bytes = std::fs::read(path).map_err(|e| FingerError::IoError {
        operation: "read_meta".to_string(),
        reason: e.to_string(),
    })?;

    if bytes.len() < 8 {
        return Err(FingerError::CorruptedIndex {
            nodeid: 0,
            reason: "meta file shorter than its framing".to_string(),
        });
    }

    let magic = u32::from_be_bytes(bytes[0..4].try_into().expect("4 bytes"));
    if magic != META_FILE_MAGIC {
        return Err(FingerError::CorruptedIndex {
            nodeid: 0,
            reason: format!(
                "invalid meta file magic: expected 0x{:X}, got 0x{:X}",
                META_FILE_MAGIC, magic
            ),
        });
    }

    let body = &bytes[4..bytes.len() - 4];
    let stored_crc = u32::from_be_bytes(bytes[bytes.len() - 4..].try_into().expect("4 bytes"));
    let computed_crc = crc32fast::hash(body);
    if stored_crc != computed_crc {
        return Err(FingerError::CorruptedIndex {
            nodeid: 0,
            reason: format!(
                "meta CRC32 mismatch: expected 0x{:X}, computed 0x{:X}",
                stored_crc, computed_crc
            ),
        });
    }

    bincode::deserialize(body).map_err(|e| FingerError::DeserializationError {
        reason: e.to_string(),
    })
}

fn freq_range(kind: &str, index: usize) -> FingerError {
    FingerError::CorruptedIndex {
        nodeid: 0,
        reason: format!("{} number {} outside frequency table", kind, index),
    }
}
