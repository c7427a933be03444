//! Integration test: unrecoverable allocation failures abort the caller.

use tarn_arena::{Arena, ArenaConfig, ArenaPos, OversizePolicy};
use tarn_test_utils::MockPages;

const PAGE: usize = 4096;

#[test]
#[should_panic(expected = "arena capacity exceeded")]
fn fixed_arena_out_of_room() {
    let mut arena = Arena::new(ArenaConfig::fixed(4096)).unwrap();
    arena.push(4000, 1, false);
    arena.push(200, 1, false);
}

#[test]
#[should_panic(expected = "reservation exhausted")]
fn reservation_out_of_room() {
    let mut arena =
        Arena::with_provider(ArenaConfig::reserve_commit(4 * PAGE), MockPages::new(PAGE)).unwrap();
    arena.push(5 * PAGE, 1, false);
}

#[test]
#[should_panic(expected = "page commit failed")]
fn refused_commit() {
    let mock = MockPages::new(PAGE);
    let mut arena =
        Arena::with_provider(ArenaConfig::reserve_commit_then_chain(16 * PAGE, PAGE), mock.clone())
            .unwrap();
    mock.fail_commits_after(0);
    arena.alloc(3 * PAGE);
}

#[test]
#[should_panic(expected = "exceeds the chunk size")]
fn rejected_oversized_request() {
    let config = ArenaConfig::chain(1024).with_oversize(OversizePolicy::Reject);
    let mut arena = Arena::new(config).unwrap();
    arena.push_array::<u64>(1000);
}

#[test]
#[should_panic(expected = "cannot rewind forward")]
fn rewind_beyond_cursor() {
    let mut arena = Arena::new(ArenaConfig::chain(1024)).unwrap();
    arena.pop_to(ArenaPos(1));
}

#[test]
#[should_panic(expected = "not a power of two")]
fn zero_alignment() {
    let mut arena = Arena::new(ArenaConfig::chain(1024)).unwrap();
    arena.push(8, 0, false);
}

#[test]
fn try_variants_do_not_panic() {
    let mut arena = Arena::new(ArenaConfig::fixed(64)).unwrap();
    arena.push(10, 1, false);
    assert!(arena.try_push(128, 8, true).is_err());
    assert!(arena.try_push_aligner(128).is_err());
    assert_eq!(arena.pos(), ArenaPos(10));
}
