// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! File locking for single-writer index access.
//!
//! Uses advisory file locks for cross-process synchronisation. The index
//! core itself is single-threaded; the lock keeps two processes from
//! opening the same index files writably at once.

use crate::error::{FingerError, FingerResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Acquires an exclusive lock on an index.
///
/// ## Input
/// - `lock_path`: path of the index `.lock` file
/// - `timeout`: maximum time to wait for the lock
///
/// ## Output
/// - `FingerResult<IndexLock>`: lock handle (RAII - auto-releases on drop)
///
/// ## Error Conditions
/// - `LockTimeout`: could not acquire the lock within `timeout`
/// - `IoError`: cannot create the lock file
pub fn acquire_lock(lock_path: &Path, timeout: Duration) -> FingerResult<IndexLock> {
    if let Some(parent) = lock_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| FingerError::IoError {
                operation: "create_lock_dir".to_string(),
                reason: e.to_string(),
            })?;
        }
    }

    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path)
        .map_err(|e| FingerError::IoError {
            operation: "create_lock_file".to_string(),
            reason: e.to_string(),
        })?;

    let start = Instant::now();

    loop {
        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                return Ok(IndexLock {
                    file: lock_file,
                    path: lock_path.to_path_buf(),
                });
            }
            Err(_) if start.elapsed() < timeout => {
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(_) => {
                return Err(FingerError::LockTimeout {
                    index: lock_path.display().to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        }
    }
}

/// Index lock handle (RAII).
///
/// The lock is automatically released when this struct is dropped.
pub struct IndexLock {
    file: File,
    #[allow(dead_code)]
    path: PathBuf,
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl std::fmt::Debug for IndexLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexLock").field("path", &self.path).finish()
    }
}
