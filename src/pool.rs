//! Pending patterns shared by the workers.
//!
//! One mutex guards the multiset, one condition variable carries both
//! "new pattern" and "production finished". A consumer that wakes up to an
//! empty, finished pool passes the signal on before leaving so that its
//! siblings leave too.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::{Condvar, Mutex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::pattern::{ElementId, NSet};

#[derive(Debug, Default)]
struct PoolState {
    patterns: Vec<NSet>,
    all_added: bool,
}

#[derive(Debug, Default)]
pub struct PatternPool {
    state: Mutex<PoolState>,
    available: Condvar,
    /// Advisory copy of the pending count, for progress display only
    remaining: AtomicUsize,
}

impl PatternPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pattern(&self, pattern: NSet) {
        self.state.lock().patterns.push(pattern);
        self.remaining.fetch_add(1, AtomicOrdering::Relaxed);
        self.available.notify_one();
    }

    /// Blocks until a pattern is available or production is over; `None`
    /// means the pool is finished and drained.
    pub fn next(&self) -> Option<NSet> {
        let mut state = self.state.lock();
        while state.patterns.is_empty() && !state.all_added {
            self.available.wait(&mut state);
        }
        match state.patterns.pop() {
            Some(pattern) => {
                self.remaining.fetch_sub(1, AtomicOrdering::Relaxed);
                Some(pattern)
            }
            None => {
                drop(state);
                self.available.notify_one();
                None
            }
        }
    }

    /// No pattern will be added any more. Idempotent.
    pub fn all_patterns_added(&self) {
        self.state.lock().all_added = true;
        self.available.notify_one();
    }

    /// Number of pending patterns, possibly stale
    pub fn remaining(&self) -> usize {
        self.remaining.load(AtomicOrdering::Relaxed)
    }
}

/// Entry of the bounded heap; the greatest is the least member.
#[derive(Debug)]
struct Ranked {
    membership: f64,
    index: usize,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other.membership.total_cmp(&self.membership)
    }
}

/// Singleton n-sets of the given tuples. With `max`, only the `max`
/// tuples of highest membership are kept; tuples tied at the cutoff are
/// sampled uniformly.
pub fn default_patterns<R: Rng + ?Sized>(
    tuples: &[(Vec<ElementId>, f64)],
    max: Option<usize>,
    rng: &mut R,
) -> Vec<NSet> {
    let singleton = |index: usize| tuples[index].0.iter().map(|&id| vec![id]).collect::<NSet>();
    let max = match max {
        Some(max) if max < tuples.len() => max,
        _ => return (0..tuples.len()).map(singleton).collect(),
    };
    if max == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Ranked> = BinaryHeap::with_capacity(max);
    // Indices out of the heap whose membership equals the heap minimum
    let mut ties: Vec<usize> = Vec::new();
    for (index, (_, membership)) in tuples.iter().enumerate() {
        let membership = *membership;
        let Some(least) = heap.peek().filter(|_| heap.len() == max) else {
            heap.push(Ranked { membership, index });
            continue;
        };
        match membership.total_cmp(&least.membership) {
            Ordering::Less => {}
            Ordering::Equal => ties.push(index),
            Ordering::Greater => {
                let popped = heap.pop();
                heap.push(Ranked { membership, index });
                match (popped, heap.peek()) {
                    (Some(popped), Some(least)) if popped.membership == least.membership => {
                        ties.push(popped.index)
                    }
                    _ => ties.clear(),
                }
            }
        }
    }
    let Some(cutoff) = heap.peek().map(|least| least.membership) else {
        return Vec::new();
    };
    let mut kept = Vec::with_capacity(max);
    let mut at_cutoff = ties;
    let mut slots = 0;
    for ranked in heap {
        if ranked.membership == cutoff {
            at_cutoff.push(ranked.index);
            slots += 1;
        } else {
            kept.push(ranked.index);
        }
    }
    at_cutoff.shuffle(rng);
    kept.extend_from_slice(&at_cutoff[..slots]);
    kept.sort_unstable();
    kept.into_iter().map(singleton).collect()
}
