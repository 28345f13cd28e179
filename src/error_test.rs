// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for FingerBase error types.

use crate::error::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_error() {
        let err = FingerError::ParseError {
            reason: "bad token".to_string(),
        };
        assert_eq!(format!("{}", err), "Parse error: bad token");
    }

    #[test]
    fn test_display_length_mismatch() {
        let err = FingerError::LengthMismatch {
            expected: 128,
            actual: 64,
        };
        assert_eq!(
            format!("{}", err),
            "Fingerprint length mismatch: expected 128 bytes, got 64"
        );
    }

    #[test]
    fn test_display_rowid_conflict() {
        let err = FingerError::RowidConflict { rowid: 42 };
        assert_eq!(format!("{}", err), "Rowid 42 already present in index");
    }

    #[test]
    fn test_display_corrupted_index() {
        let err = FingerError::CorruptedIndex {
            nodeid: 7,
            reason: "item count exceeds capacity".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Corrupted index node 7: item count exceeds capacity"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FingerError = io.into();
        match err {
            FingerError::IoError { operation, reason } => {
                assert_eq!(operation, "unknown");
                assert!(reason.contains("gone"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
