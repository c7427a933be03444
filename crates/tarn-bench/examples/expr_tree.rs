//! Build and evaluate an expression tree in each kind of arena.
//!
//! Demonstrates: create an arena → push nodes → save a position → build
//! temporary nodes → rewind → reuse the space → release.

use std::ptr::NonNull;

use tarn_arena::{Arena, ArenaConfig, GrowthMode, PageProvider};

#[derive(Clone, Copy)]
enum Node {
    Int(i64),
    Add(NonNull<Node>, NonNull<Node>),
    Mul(NonNull<Node>, NonNull<Node>),
}

enum Step {
    Visit(NonNull<Node>),
    Add,
    Mul,
}

/// Evaluate without recursion; the trees below are 100k levels deep.
fn eval(root: NonNull<Node>) -> i64 {
    let mut work = vec![Step::Visit(root)];
    let mut values = Vec::new();
    while let Some(step) = work.pop() {
        match step {
            // SAFETY: every node is written by `push_value` and the arena is
            // not rewound below it while the tree is evaluated.
            Step::Visit(node) => match unsafe { *node.as_ptr() } {
                Node::Int(v) => values.push(v),
                Node::Add(a, b) => work.extend([Step::Add, Step::Visit(b), Step::Visit(a)]),
                Node::Mul(a, b) => work.extend([Step::Mul, Step::Visit(b), Step::Visit(a)]),
            },
            Step::Add | Step::Mul => {
                let rhs = values.pop().unwrap_or_default();
                let lhs = values.pop().unwrap_or_default();
                values.push(if matches!(step, Step::Add) { lhs + rhs } else { lhs * rhs });
            }
        }
    }
    values.pop().unwrap_or_default()
}

/// Sum of `i * i` for `i` in `1..=n`, as a tree.
fn sum_of_squares<P: PageProvider>(arena: &mut Arena<P>, n: i64) -> NonNull<Node> {
    let mut acc = arena.push_value(Node::Int(0));
    for i in 1..=n {
        let x = arena.push_value(Node::Int(i));
        let sq = arena.push_value(Node::Mul(x, x));
        acc = arena.push_value(Node::Add(acc, sq));
    }
    acc
}

fn main() {
    println!("=== Tarn expression tree example ===\n");

    for mode in GrowthMode::ALL {
        let config = match mode {
            GrowthMode::Fixed => ArenaConfig::fixed(16 * 1024 * 1024),
            GrowthMode::Chain => ArenaConfig::chain(64 * 1024),
            GrowthMode::ReserveCommit => ArenaConfig::reserve_commit(1 << 30),
            GrowthMode::ReserveCommitThenChain => {
                ArenaConfig::reserve_commit_then_chain(1024 * 1024, 64 * 1024)
            }
        };
        let mut arena = Arena::new(config).unwrap();

        let small = sum_of_squares(&mut arena, 10);
        let saved = arena.pos();

        let big = sum_of_squares(&mut arena, 100_000);
        let big_value = eval(big);
        let peak = arena.pos();

        arena.pop_to(saved);
        let again = sum_of_squares(&mut arena, 3);

        println!("{mode}:");
        println!("  sum 1..10      = {}", eval(small));
        println!("  sum 1..100000  = {big_value}");
        println!("  sum 1..3       = {}", eval(again));
        println!(
            "  peak {peak} bytes, {} chunks, spilled: {}",
            arena.chunk_count(),
            arena.has_spilled()
        );
        println!("  metrics: {:?}\n", arena.metrics());

        arena.release().unwrap();
    }
}
