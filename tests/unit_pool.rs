//! Unit tests for the pattern pool and the default initial patterns

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use nclusterbox::pattern::{ElementId, NSet};
use nclusterbox::pool::{default_patterns, PatternPool};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn singleton(i: u32) -> NSet {
    vec![vec![i], vec![0]]
}

#[test]
fn test_three_patterns_then_empty() {
    let pool = PatternPool::new();
    for i in 0..3 {
        pool.add_pattern(singleton(i));
    }
    pool.all_patterns_added();
    let taken: HashSet<NSet> = (0..3).map(|_| pool.next().unwrap()).collect();
    assert_eq!(taken.len(), 3);
    assert_eq!(pool.next(), None);
}

#[test]
fn test_waiting_consumers_all_leave() {
    let pool = Arc::new(PatternPool::new());
    let consumers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut count = 0;
                while pool.next().is_some() {
                    count += 1;
                }
                count
            })
        })
        .collect();
    pool.add_pattern(singleton(0));
    pool.all_patterns_added();
    let total: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    assert_eq!(total, 1);
}

#[test]
fn test_concurrent_consumption() {
    let pool = Arc::new(PatternPool::new());
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(pattern) = pool.next() {
                    taken.push(pattern);
                }
                taken
            })
        })
        .collect();
    for i in 0..1000 {
        pool.add_pattern(singleton(i));
    }
    pool.all_patterns_added();
    let mut seen = HashSet::new();
    for consumer in consumers {
        for pattern in consumer.join().unwrap() {
            assert!(seen.insert(pattern));
        }
    }
    assert_eq!(seen.len(), 1000);
    assert_eq!(pool.remaining(), 0);
}

fn tuples(memberships: &[f64]) -> Vec<(Vec<ElementId>, f64)> {
    memberships
        .iter()
        .enumerate()
        .map(|(i, &m)| (vec![i as ElementId, 0], m))
        .collect()
}

#[test]
fn test_ties_at_cutoff_are_sampled() {
    let tuples = tuples(&[0.5, 0.9, 0.5, 0.1, 0.5]);
    let mut chosen = HashSet::new();
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let patterns = default_patterns(&tuples, Some(2), &mut rng);
        assert_eq!(patterns.len(), 2);
        assert!(patterns.contains(&vec![vec![1], vec![0]]));
        let tied: Vec<_> = patterns
            .iter()
            .filter(|nset| [0, 2, 4].contains(&nset[0][0]))
            .collect();
        assert_eq!(tied.len(), 1);
        chosen.insert(tied[0][0][0]);
    }
    assert_eq!(chosen, HashSet::from([0, 2, 4]));
}

#[test]
fn test_no_bound_keeps_every_tuple() {
    let mut rng = StdRng::seed_from_u64(7);
    let tuples = tuples(&[0.5, 0.9, 0.5]);
    assert_eq!(default_patterns(&tuples, None, &mut rng).len(), 3);
    assert_eq!(default_patterns(&tuples, Some(3), &mut rng).len(), 3);
}
