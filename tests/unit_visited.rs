//! Unit tests for the shared set of visited patterns

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

use nclusterbox::config::DedupMode;
use nclusterbox::visited::VisitedPatterns;

#[test]
fn test_exactly_one_thread_sees_a_new_pattern() {
    for mode in [DedupMode::Hashed, DedupMode::Trie] {
        let visited = VisitedPatterns::new(mode, &[4, 4, 3]);
        let fresh = AtomicUsize::new(0);
        let barrier = Barrier::new(8);
        let nset = vec![vec![1, 3], vec![0], vec![0, 1, 2]];
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    if !visited.visited(&nset) {
                        fresh.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });
        assert_eq!(fresh.load(Ordering::Relaxed), 1);
        assert_eq!(visited.len(), 1);
    }
}

#[test]
fn test_concurrent_distinct_patterns_are_all_recorded() {
    let visited = VisitedPatterns::new(DedupMode::Trie, &[10, 10]);
    thread::scope(|scope| {
        for first in 0..10u32 {
            let visited = &visited;
            scope.spawn(move || {
                for second in 0..10u32 {
                    assert!(!visited.visited(&[vec![first], vec![second]]));
                }
            });
        }
    });
    assert_eq!(visited.len(), 100);
}

#[test]
fn test_same_elements_on_other_axes_differ() {
    for mode in [DedupMode::Hashed, DedupMode::Trie] {
        let visited = VisitedPatterns::new(mode, &[3, 3]);
        assert!(!visited.visited(&[vec![0, 1], vec![2]]));
        assert!(!visited.visited(&[vec![0], vec![1, 2]]));
        assert!(!visited.visited(&[vec![2], vec![0, 1]]));
        assert!(visited.visited(&[vec![0, 1], vec![2]]));
        assert_eq!(visited.len(), 3);
    }
}

#[test]
fn test_disabled_never_remembers() {
    let visited = VisitedPatterns::new(DedupMode::Disabled, &[2, 2]);
    for _ in 0..3 {
        assert!(!visited.visited(&[vec![0], vec![1]]));
    }
    assert!(visited.is_empty());
}

#[test]
fn test_huge_leading_axes_are_bucketed() {
    let visited = VisitedPatterns::new(DedupMode::Hashed, &[100_000, 100_000, 2]);
    assert!(!visited.visited(&[vec![99_999], vec![99_999], vec![1]]));
    assert!(visited.visited(&[vec![99_999], vec![99_999], vec![1]]));
}
