//! Error kinds reported by the list containers.

use super::FreezeMode;

/// The largest number of items (or virtual slots) a list can hold.
pub const MAX_LEN: usize = u32::MAX as usize;

/// Errors returned by fallible list operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AListError {
    /// An index was outside `[0, len)` (or `[0, len]` for insertion points).
    #[error("index {index} is out of range for a list of {len} items")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The list length at the time of the call.
        len: usize,
    },
    /// A range `[index, index + count)` extended past the end of the list.
    #[error("range of {count} items at index {index} exceeds a list of {len} items")]
    RangeOutOfBounds {
        /// First index of the range.
        index: usize,
        /// Number of items in the range.
        count: usize,
        /// The list length at the time of the call.
        len: usize,
    },
    /// The container's freeze mode forbids mutation.
    #[error("list is read-only ({mode:?})")]
    ReadOnly {
        /// The mode that rejected the call.
        mode: FreezeMode,
    },
    /// The node variant does not implement this mutation path.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    /// The operation would push the length past [`MAX_LEN`].
    #[error("adding {additional} items to a list of {len} would exceed the maximum length {max}")]
    CapacityOverflow {
        /// Current length.
        len: usize,
        /// Number of items the caller tried to add.
        additional: usize,
        /// The representable maximum.
        max: usize,
    },
    /// A cursor was used after the list it walks was structurally modified.
    #[error("list changed while a cursor was active (version {expected} -> {actual})")]
    Stale {
        /// Version recorded when the cursor was created.
        expected: u64,
        /// Version of the list now.
        actual: u64,
    },
    /// A configuration value is outside its legal range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The invariant checker found an inconsistent tree.
    #[error("tree invariant violated: {0}")]
    Corrupt(String),
}

/// Result alias used across the crate.
pub type Result<T, E = AListError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AListError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(err.to_string(), "index 7 is out of range for a list of 3 items");

        let err = AListError::ReadOnly { mode: FreezeMode::Frozen };
        assert_eq!(err.to_string(), "list is read-only (Frozen)");

        let err = AListError::CapacityOverflow { len: 1, additional: MAX_LEN, max: MAX_LEN };
        assert!(err.to_string().contains("exceed the maximum length"));
    }
}
