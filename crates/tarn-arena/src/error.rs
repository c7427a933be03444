//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use tarn_core::PageError;

/// Errors that can occur during arena operations.
///
/// Construction reports these as values. The allocation entry points
/// (`push`, `alloc`, ...) treat them as fatal and panic; the `try_*`
/// variants hand them back instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The configuration is unusable for its mode.
    InvalidConfig {
        /// What is wrong with it.
        reason: String,
    },
    /// The heap refused a buffer or chunk allocation.
    OutOfMemory {
        /// Number of bytes requested from the heap.
        requested: usize,
    },
    /// The OS refused to reserve address space.
    ReserveFailed(PageError),
    /// The OS refused to commit pages inside the reservation.
    CommitFailed(PageError),
    /// The OS refused to tear down the reservation.
    ReleaseFailed(PageError),
    /// A fixed-capacity arena has no room left for the request.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Total capacity of the arena.
        capacity: usize,
    },
    /// The request does not fit in what remains of the reservation.
    ReservationExhausted {
        /// Number of bytes requested.
        requested: usize,
        /// Size of the reservation.
        reserved: usize,
    },
    /// The byte size of a typed array request overflows `usize`.
    SizeOverflow {
        /// Number of elements requested.
        count: usize,
        /// Size of one element in bytes.
        elem_size: usize,
    },
    /// A single request is larger than one chunk and the arena is
    /// configured to reject oversized requests.
    RequestTooLarge {
        /// Number of bytes requested (including alignment slack).
        requested: usize,
        /// The arena's chunk size.
        chunk_size: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::OutOfMemory { requested } => {
                write!(f, "heap allocation of {requested} bytes failed")
            }
            Self::ReserveFailed(e) => write!(f, "address space reservation failed: {e}"),
            Self::CommitFailed(e) => write!(f, "page commit failed: {e}"),
            Self::ReleaseFailed(e) => write!(f, "reservation release failed: {e}"),
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, capacity {capacity} bytes"
                )
            }
            Self::ReservationExhausted {
                requested,
                reserved,
            } => {
                write!(
                    f,
                    "reservation exhausted: requested {requested} bytes, reserved {reserved} bytes"
                )
            }
            Self::SizeOverflow { count, elem_size } => {
                write!(
                    f,
                    "array size overflows: {count} elements of {elem_size} bytes"
                )
            }
            Self::RequestTooLarge {
                requested,
                chunk_size,
            } => {
                write!(
                    f,
                    "request of {requested} bytes exceeds the chunk size of {chunk_size} bytes"
                )
            }
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReserveFailed(e) | Self::CommitFailed(e) | Self::ReleaseFailed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::PageOp;

    #[test]
    fn page_failures_expose_source() {
        let err = ArenaError::CommitFailed(PageError::new(PageOp::Commit, 0x2000, 4096, Some(12)));
        let source = err.source().expect("commit failure wraps a PageError");
        assert_eq!(source.to_string(), "commit of 4096 bytes at 0x2000 failed (os error 12)");
    }

    #[test]
    fn capacity_message_names_both_sizes() {
        let err = ArenaError::CapacityExceeded {
            requested: 96,
            capacity: 64,
        };
        assert_eq!(
            err.to_string(),
            "arena capacity exceeded: requested 96 bytes, capacity 64 bytes"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn size_overflow_names_count_and_element() {
        let err = ArenaError::SizeOverflow {
            count: usize::MAX,
            elem_size: 8,
        };
        assert_eq!(
            err.to_string(),
            format!("array size overflows: {} elements of 8 bytes", usize::MAX)
        );
    }
}
