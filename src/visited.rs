//! Set of the patterns already met by some worker.
//!
//! A pattern is flattened into one key, the ids of axis k being shifted by
//! the sum of the cardinalities of the previous axes. The tuple made of
//! the first id of every axis but the last picks one of independently
//! locked buckets, so concurrent checks of distinct patterns rarely wait
//! on each other.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::config::DedupMode;
use crate::pattern::ElementId;

const MAX_BUCKETS: usize = 1 << 16;

/// Check-and-insert storage of one bucket
pub trait KeySet: Default + Send {
    /// Records `key`; false if it was already there.
    fn insert_key(&mut self, key: &[u32]) -> bool;

    fn key_count(&self) -> usize;
}

impl KeySet for HashSet<Vec<u32>> {
    fn insert_key(&mut self, key: &[u32]) -> bool {
        if self.contains(key) {
            return false;
        }
        self.insert(key.to_vec())
    }

    fn key_count(&self) -> usize {
        self.len()
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    /// (key item, node index), sorted by key item
    children: Vec<(u32, u32)>,
    present: bool,
}

/// Keys sharing prefixes share nodes; nodes live in one arena.
#[derive(Debug)]
pub struct KeyTrie {
    nodes: Vec<TrieNode>,
    keys: usize,
}

impl Default for KeyTrie {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            keys: 0,
        }
    }
}

impl KeySet for KeyTrie {
    fn insert_key(&mut self, key: &[u32]) -> bool {
        let mut node = 0;
        for &item in key {
            let children = &self.nodes[node].children;
            node = match children.binary_search_by_key(&item, |&(item, _)| item) {
                Ok(position) => children[position].1 as usize,
                Err(position) => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(position, (item, child as u32));
                    child
                }
            };
        }
        let fresh = !std::mem::replace(&mut self.nodes[node].present, true);
        self.keys += usize::from(fresh);
        fresh
    }

    fn key_count(&self) -> usize {
        self.keys
    }
}

#[derive(Debug)]
pub struct Buckets<S> {
    buckets: Vec<Mutex<S>>,
    offsets: Vec<u32>,
    /// Row-major strides over every axis but the last
    strides: Vec<usize>,
}

impl<S: KeySet> Buckets<S> {
    fn new(cardinalities: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(cardinalities.len());
        let mut offset = 0u32;
        for &card in cardinalities {
            offsets.push(offset);
            offset = offset.saturating_add(card as u32);
        }
        let leading = &cardinalities[..cardinalities.len().saturating_sub(1)];
        let mut strides = vec![1usize; leading.len()];
        for axis in (0..leading.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1].saturating_mul(leading[axis + 1]);
        }
        let count = leading
            .iter()
            .try_fold(1usize, |product, &card| product.checked_mul(card))
            .map_or(MAX_BUCKETS, |product| product.clamp(1, MAX_BUCKETS));
        Self {
            buckets: (0..count).map(|_| Mutex::new(S::default())).collect(),
            offsets,
            strides,
        }
    }

    fn bucket(&self, nset: &[Vec<ElementId>]) -> usize {
        let tuple_id = nset
            .iter()
            .zip(&self.strides)
            .map(|(subset, &stride)| {
                subset
                    .first()
                    .map_or(0, |&id| (id as usize).wrapping_mul(stride))
            })
            .fold(0usize, usize::wrapping_add);
        tuple_id % self.buckets.len()
    }

    fn key(&self, nset: &[Vec<ElementId>]) -> Vec<u32> {
        nset.iter()
            .zip(&self.offsets)
            .flat_map(|(subset, &offset)| subset.iter().map(move |&id| id + offset))
            .collect()
    }

    fn visited(&self, nset: &[Vec<ElementId>]) -> bool {
        let key = self.key(nset);
        !self.buckets[self.bucket(nset)].lock().insert_key(&key)
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.lock().key_count()).sum()
    }
}

#[derive(Debug)]
pub enum VisitedPatterns {
    Disabled,
    Hashed(Buckets<HashSet<Vec<u32>>>),
    Trie(Buckets<KeyTrie>),
}

impl VisitedPatterns {
    pub fn new(mode: DedupMode, cardinalities: &[usize]) -> Self {
        match mode {
            DedupMode::Disabled => VisitedPatterns::Disabled,
            DedupMode::Hashed => VisitedPatterns::Hashed(Buckets::new(cardinalities)),
            DedupMode::Trie => VisitedPatterns::Trie(Buckets::new(cardinalities)),
        }
    }

    /// Whether `nset` was met before; records it if not. Always false
    /// when disabled.
    pub fn visited(&self, nset: &[Vec<ElementId>]) -> bool {
        match self {
            VisitedPatterns::Disabled => false,
            VisitedPatterns::Hashed(buckets) => buckets.visited(nset),
            VisitedPatterns::Trie(buckets) => buckets.visited(nset),
        }
    }

    /// Number of recorded patterns
    pub fn len(&self) -> usize {
        match self {
            VisitedPatterns::Disabled => 0,
            VisitedPatterns::Hashed(buckets) => buckets.len(),
            VisitedPatterns::Trie(buckets) => buckets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_separate_axes() {
        let buckets: Buckets<KeyTrie> = Buckets::new(&[2, 3, 4]);
        assert_eq!(buckets.key(&[vec![1], vec![0, 2], vec![3]]), vec![1, 2, 4, 8]);
        assert_eq!(buckets.buckets.len(), 6);
        assert_eq!(buckets.bucket(&[vec![1], vec![2], vec![0, 1]]), 5);
    }

    #[test]
    fn strides_are_row_major() {
        let buckets: Buckets<KeyTrie> = Buckets::new(&[2, 3, 4, 5]);
        assert_eq!(buckets.strides, vec![12, 4, 1]);
        assert_eq!(buckets.buckets.len(), 24);
        assert_eq!(buckets.bucket(&[vec![1], vec![2], vec![3], vec![0]]), 23);
    }

    #[test]
    fn every_mode_records_once() {
        let a = vec![vec![0, 1], vec![2]];
        let b = vec![vec![0], vec![1, 2]];
        for mode in [DedupMode::Hashed, DedupMode::Trie] {
            let visited = VisitedPatterns::new(mode, &[2, 3]);
            assert!(!visited.visited(&a));
            assert!(!visited.visited(&b));
            assert!(visited.visited(&a));
            assert!(visited.visited(&b));
            assert_eq!(visited.len(), 2);
        }
        let disabled = VisitedPatterns::new(DedupMode::Disabled, &[2, 3]);
        assert!(!disabled.visited(&a));
        assert!(!disabled.visited(&a));
        assert!(disabled.is_empty());
    }

    #[test]
    fn trie_distinguishes_prefixes() {
        let mut trie = KeyTrie::default();
        assert!(trie.insert_key(&[1, 2, 3]));
        assert!(trie.insert_key(&[1, 2]));
        assert!(!trie.insert_key(&[1, 2]));
        assert!(trie.insert_key(&[1, 3]));
        assert_eq!(trie.key_count(), 3);
    }
}
