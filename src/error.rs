//! Failures raised while verifying a table under test.
//!
//! Two families exist. [`LayoutMismatch`] is a setup error: the table's
//! record shapes do not match what bucket index recovery assumes, so no
//! verification may run for that table type. [`VerifyError`] is a test
//! failure raised by a single verification call.

use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

/// The table or bucket record of a table under test has an unexpected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutMismatch {
    /// The declared fields differ from the expected field list.
    #[error("{record} declares fields {actual:?}, expected exactly {expected:?}")]
    FieldNames {
        /// Name of the offending record type.
        record: &'static str,
        /// The field names the record must declare, in order.
        expected: Vec<&'static str>,
        /// The field names the record actually declares.
        actual: Vec<&'static str>,
    },

    /// A field has the wrong type.
    #[error("{record}::{field} has type {actual}, expected {expected}")]
    FieldType {
        /// Name of the offending record type.
        record: &'static str,
        /// Name of the mistyped field.
        field: &'static str,
        /// The type the field must have.
        expected: &'static str,
        /// The type the field actually has.
        actual: &'static str,
    },

    /// A field sits at a different byte offset than in the reference record.
    #[error("{record}::{field} is at offset {actual}, expected {expected}")]
    FieldOffset {
        /// Name of the offending record type.
        record: &'static str,
        /// Name of the misplaced field.
        field: &'static str,
        /// Offset of the field in the reference record.
        expected: usize,
        /// Offset of the field in the record under test.
        actual: usize,
    },

    /// The declared shape describes some other type than the record it was
    /// declared for.
    #[error("{record} ({actual_size} bytes) declares the shape of {declared} ({declared_size} bytes)")]
    ForeignShape {
        /// Name of the record type the shape was requested for.
        record: &'static str,
        /// Name of the type the shape actually describes.
        declared: &'static str,
        /// Size of the record type.
        actual_size: usize,
        /// Size of the described type.
        declared_size: usize,
    },

    /// The record is larger or smaller than the reference record.
    #[error(
        "{record} is {actual} bytes, expected {expected}; did you add, remove, or rearrange fields?"
    )]
    RecordSize {
        /// Name of the offending record type.
        record: &'static str,
        /// Size of the reference record.
        expected: usize,
        /// Size of the record under test.
        actual: usize,
    },
}

/// A verification call observed behavior that differs from the expectation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The table compared against more buckets than expected.
    #[error("probe sequence too long: expected {expected_len} probes, then saw bucket {actual}")]
    ProbeSequenceTooLong {
        /// Length of the expected probe sequence.
        expected_len: usize,
        /// The bucket probed after the sequence was exhausted.
        actual: usize,
    },

    /// The table probed a different bucket than expected.
    #[error("probe sequence mismatch at probe {position}: expected bucket {expected}, got {actual}")]
    ProbeSequenceMismatch {
        /// Zero-based position within the expected sequence.
        position: usize,
        /// The bucket that should have been probed.
        expected: usize,
        /// The bucket that was probed.
        actual: usize,
    },

    /// The table stopped probing before the expected sequence was complete.
    #[error("probe sequence too short: expected {expected_len} probes, saw {observed}")]
    ProbeSequenceTooShort {
        /// Length of the expected probe sequence.
        expected_len: usize,
        /// Number of probes that matched before the operation finished.
        observed: usize,
    },

    /// The operation returned a different value than expected.
    #[error("expected result {expected}, got {actual}")]
    UnexpectedResult {
        /// Debug rendering of the expected value.
        expected: String,
        /// Debug rendering of the returned value.
        actual: String,
    },

    /// The expected size can never be reached by a table with this many buckets.
    #[error("expected size {expected} is greater than the number of buckets {capacity}")]
    SizeExceedsCapacity {
        /// The expected element count.
        expected: usize,
        /// Number of buckets in the table.
        capacity: usize,
    },

    /// The table reports a different element count than expected.
    #[error("expected size {expected}, got {actual}")]
    SizeMismatch {
        /// The expected element count.
        expected: usize,
        /// The element count the table reports.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;

    #[test]
    fn messages_carry_expected_and_actual() {
        let err = VerifyError::ProbeSequenceMismatch {
            position: 1,
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "probe sequence mismatch at probe 1: expected bucket 3, got 2"
        );

        let err = VerifyError::SizeExceedsCapacity {
            expected: 5,
            capacity: 4,
        };
        assert_eq!(
            err.to_string(),
            "expected size 5 is greater than the number of buckets 4"
        );
    }

    #[test]
    fn layout_message_names_record() {
        let err = LayoutMismatch::FieldNames {
            record: "Slot",
            expected: vec!["status", "key", "value"],
            actual: vec!["key", "status", "value"],
        };
        assert_eq!(
            err.to_string(),
            r#"Slot declares fields ["key", "status", "value"], expected exactly ["status", "key", "value"]"#
        );
    }
}
