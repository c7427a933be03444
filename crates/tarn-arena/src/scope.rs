//! Scoped rewind guard.

use std::ops::{Deref, DerefMut};

use tarn_core::{ArenaPos, PageProvider};

use crate::arena::Arena;

/// Rewinds its arena to the position it was created at when dropped.
///
/// Everything pushed through the guard is temporary scratch. If the arena
/// was already rewound below the saved position inside the scope, the drop
/// leaves it where it is.
///
/// ```
/// use tarn_arena::{Arena, ArenaConfig};
///
/// let mut arena = Arena::new(ArenaConfig::fixed(4096)).unwrap();
/// arena.push(16, 8, true);
/// {
///     let mut scratch = arena.scope();
///     scratch.push(1024, 8, false);
///     assert_eq!(scratch.pos().get(), 1040);
/// }
/// assert_eq!(arena.pos().get(), 16);
/// ```
pub struct ArenaScope<'a, P: PageProvider> {
    arena: &'a mut Arena<P>,
    saved: ArenaPos,
}

impl<'a, P: PageProvider> ArenaScope<'a, P> {
    pub(crate) fn new(arena: &'a mut Arena<P>) -> Self {
        let saved = arena.pos();
        Self { arena, saved }
    }

    /// The position the arena returns to when the guard drops.
    pub fn saved(&self) -> ArenaPos {
        self.saved
    }
}

impl<P: PageProvider> Deref for ArenaScope<'_, P> {
    type Target = Arena<P>;

    fn deref(&self) -> &Arena<P> {
        self.arena
    }
}

impl<P: PageProvider> DerefMut for ArenaScope<'_, P> {
    fn deref_mut(&mut self) -> &mut Arena<P> {
        self.arena
    }
}

impl<P: PageProvider> Drop for ArenaScope<'_, P> {
    fn drop(&mut self) {
        if self.saved <= self.arena.pos() {
            self.arena.pop_to(self.saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Arena, ArenaConfig};

    #[test]
    fn scope_rewinds_on_drop() {
        let mut arena = Arena::new(ArenaConfig::chain(256)).unwrap();
        arena.push(10, 1, false);
        {
            let mut scope = arena.scope();
            for _ in 0..8 {
                scope.push(100, 1, false);
            }
            assert!(scope.chunk_count() > 1);
        }
        assert_eq!(arena.pos().get(), 10);
        assert_eq!(arena.chunks().unwrap().current_index(), 0);
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let mut arena = Arena::new(ArenaConfig::fixed(1024)).unwrap();
        {
            let mut outer = arena.scope();
            outer.push(100, 1, false);
            {
                let mut inner = outer.scope();
                inner.push(100, 1, false);
                assert_eq!(inner.saved().get(), 100);
            }
            assert_eq!(outer.pos().get(), 100);
        }
        assert_eq!(arena.pos().get(), 0);
    }

    #[test]
    fn scope_leaves_deeper_rewind_alone() {
        let mut arena = Arena::new(ArenaConfig::fixed(1024)).unwrap();
        arena.push(100, 1, false);
        {
            let mut scope = arena.scope();
            scope.clear();
        }
        assert_eq!(arena.pos().get(), 0);
    }
}
