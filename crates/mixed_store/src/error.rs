//! # Store Error Types
//!
//! All errors that can occur while building a layout or touching a store.
//!
//! Every operation validates its arguments before it mutates anything, so an
//! `Err` always means the store is exactly as it was before the call.

use std::fmt;

use thiserror::Error;

/// Which axis an out-of-range index was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// A row index, checked against the record count.
    Row,
    /// A column index, checked against the field count.
    Column,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// Errors that can occur in the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A row or column index was outside `0..len`.
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Axis that was checked.
        kind: IndexKind,
        /// The offending index.
        index: usize,
        /// Number of valid indices on that axis.
        len: usize,
    },

    /// A row was supplied with the wrong number of values.
    #[error("row has {given} values, layout has {expected} fields")]
    ArityMismatch {
        /// Number of fields in the layout.
        expected: usize,
        /// Number of values supplied.
        given: usize,
    },

    /// The builder/store API was used out of order.
    #[error("build order violation: {0}")]
    BuildOrderViolation(&'static str),

    /// A value was read or written as a type other than its column's type.
    #[error("column {column} holds `{expected}`, accessed as `{found}`")]
    TypeMismatch {
        /// Column that was accessed.
        column: usize,
        /// Type registered for that column.
        expected: &'static str,
        /// Type the caller asked for.
        found: &'static str,
    },

    /// No column was registered with the requested type.
    #[error("no column holds `{0}`")]
    FieldNotFound(&'static str),

    /// Two mutable borrows were requested for the same column.
    #[error("column {0} borrowed mutably twice")]
    AliasedColumn(usize),

    /// The record layout does not fit in the address space.
    #[error("record layout overflows the address space")]
    LayoutOverflow,

    /// The buffer for the requested record count does not fit in memory.
    #[error("capacity overflow: cannot hold {requested} records")]
    CapacityOverflow {
        /// Record count that was requested.
        requested: usize,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::IndexOutOfRange {
            kind: IndexKind::Row,
            index: 4,
            len: 2,
        };
        assert_eq!(err.to_string(), "row index 4 out of range (len 2)");

        let err = StoreError::ArityMismatch {
            expected: 3,
            given: 2,
        };
        assert_eq!(err.to_string(), "row has 2 values, layout has 3 fields");
    }
}
