// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for FingerBase operations.
//!
//! Provides structured error handling with detailed context for debugging.

use std::fmt;

/// Standard Result type for all FingerBase operations.
pub type FingerResult<T> = Result<T, FingerError>;

/// Error types for FingerBase operations.
#[derive(Debug, Clone)]
pub enum FingerError {
    /// Parse error (invalid declaration, malformed constraint blob, bad argument).
    ParseError { reason: String },

    /// Two fingerprints of different lengths were combined.
    LengthMismatch { expected: usize, actual: usize },

    /// Corrupted index page or mapping table.
    CorruptedIndex { nodeid: i64, reason: String },

    /// I/O error during file operations.
    IoError { operation: String, reason: String },

    /// Serialisation error.
    SerializationError { reason: String },

    /// Deserialisation error.
    DeserializationError { reason: String },

    /// Insertion of a rowid that is already present in the index.
    RowidConflict { rowid: i64 },

    /// Rowid not present in the index.
    RowidNotFound { rowid: i64 },

    /// Lock timeout waiting for exclusive access to the index files.
    LockTimeout { index: String, timeout_secs: u64 },

    /// Interrupt flag observed between cursor steps.
    Interrupted,
}

impl fmt::Display for FingerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { reason } => {
                write!(f, "Parse error: {}", reason)
            }
            Self::LengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Fingerprint length mismatch: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::CorruptedIndex { nodeid, reason } => {
                write!(f, "Corrupted index node {}: {}", nodeid, reason)
            }
            Self::IoError { operation, reason } => {
                write!(f, "I/O error during '{}': {}", operation, reason)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialisation error: {}", reason)
            }
            Self::DeserializationError { reason } => {
                write!(f, "Deserialisation error: {}", reason)
            }
            Self::RowidConflict { rowid } => {
                write!(f, "Rowid {} already present in index", rowid)
            }
            Self::RowidNotFound { rowid } => {
                write!(f, "Rowid {} not found in index", rowid)
            }
            Self::LockTimeout {
                index,
                timeout_secs,
            } => {
                write!(f, "Lock timeout for index '{}' after {}s", index, timeout_secs)
            }
            Self::Interrupted => {
                write!(f, "Operation interrupted")
            }
        }
    }
}

impl std::error::Error for FingerError {}

// Convenience conversion from std::io::Error
impl From<std::io::Error> for FingerError {
    fn from(err: std::io::Error) -> Self {
        FingerError::IoError {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}
