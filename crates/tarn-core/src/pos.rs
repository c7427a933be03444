//! Arena cursor positions.

use std::fmt;
use std::ops::{Add, Sub};

/// A byte offset into an arena's logical address space.
///
/// Positions are produced by `Arena::pos()` and consumed by `Arena::pop_to()`.
/// They are only meaningful for the arena that produced them. A position
/// stays valid as a rewind target until the arena is rewound below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaPos(pub usize);

impl ArenaPos {
    /// The logical base of every arena.
    pub const ZERO: Self = Self(0);

    /// The raw byte offset.
    pub fn get(self) -> usize {
        self.0
    }

    /// Bytes between `earlier` and `self`, or `None` if `earlier` is later.
    pub fn bytes_since(self, earlier: ArenaPos) -> Option<usize> {
        self.0.checked_sub(earlier.0)
    }
}

impl fmt::Display for ArenaPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ArenaPos {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

impl From<ArenaPos> for usize {
    fn from(pos: ArenaPos) -> Self {
        pos.0
    }
}

impl Add<usize> for ArenaPos {
    type Output = ArenaPos;

    fn add(self, rhs: usize) -> ArenaPos {
        ArenaPos(self.0 + rhs)
    }
}

impl Sub<usize> for ArenaPos {
    type Output = ArenaPos;

    fn sub(self, rhs: usize) -> ArenaPos {
        ArenaPos(self.0 - rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_offset() {
        assert!(ArenaPos(10) > ArenaPos(3));
        assert_eq!(ArenaPos::ZERO, ArenaPos(0));
    }

    #[test]
    fn bytes_since_rejects_later_start() {
        assert_eq!(ArenaPos(40).bytes_since(ArenaPos(8)), Some(32));
        assert_eq!(ArenaPos(8).bytes_since(ArenaPos(40)), None);
    }

    #[test]
    fn arithmetic_round_trips() {
        let p = ArenaPos(100) + 28;
        assert_eq!(p.get(), 128);
        assert_eq!((p - 28).get(), 100);
        assert_eq!(usize::from(p), 128);
        assert_eq!(p.to_string(), "128");
    }
}
