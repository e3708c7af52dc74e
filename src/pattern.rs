//! n-sets: one sorted, duplicate-free subset of element ids per axis.

/// Element id within one axis
pub type ElementId = u32;

/// A pattern: `nset[axis]` is the sorted subset of that axis
pub type NSet = Vec<Vec<ElementId>>;

/// Number of tuples in the Cartesian product of the subsets.
pub fn area(nset: &[Vec<ElementId>]) -> u64 {
    nset.iter().map(|subset| subset.len() as u64).product()
}

/// Inserts `id` keeping `subset` sorted. Returns false if already present.
pub fn insert_sorted(subset: &mut Vec<ElementId>, id: ElementId) -> bool {
    match subset.binary_search(&id) {
        Ok(_) => false,
        Err(pos) => {
            subset.insert(pos, id);
            true
        }
    }
}

/// Removes `id` from the sorted `subset`. Returns false if absent.
pub fn erase_sorted(subset: &mut Vec<ElementId>, id: ElementId) -> bool {
    match subset.binary_search(&id) {
        Ok(pos) => {
            subset.remove(pos);
            true
        }
        Err(_) => false,
    }
}

/// True iff every subset is non-empty, strictly increasing and within its
/// axis cardinality.
pub fn is_well_formed(nset: &[Vec<ElementId>], cardinalities: &[usize]) -> bool {
    nset.len() == cardinalities.len()
        && nset.iter().zip(cardinalities).all(|(subset, &card)| {
            !subset.is_empty()
                && subset.windows(2).all(|w| w[0] < w[1])
                && subset.last().is_some_and(|&last| (last as usize) < card)
        })
}

/// Intersection of two patterns, `None` when some axis is disjoint.
pub fn intersection(a: &[Vec<ElementId>], b: &[Vec<ElementId>]) -> Option<NSet> {
    let mut result = Vec::with_capacity(a.len());
    for (sa, sb) in a.iter().zip(b) {
        let mut common = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < sa.len() && j < sb.len() {
            match sa[i].cmp(&sb[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    common.push(sa[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        if common.is_empty() {
            return None;
        }
        result.push(common);
    }
    Some(result)
}

// ============================================================================
// ITERATORS
// ============================================================================

/// Iterator over every tuple of a pattern, first axis varying fastest
pub struct Tuples<'a> {
    nset: &'a [Vec<ElementId>],
    positions: Vec<usize>,
    done: bool,
}

impl<'a> Tuples<'a> {
    pub fn new(nset: &'a [Vec<ElementId>]) -> Self {
        let done = nset.is_empty() || nset.iter().any(|subset| subset.is_empty());
        Self {
            nset,
            positions: vec![0; nset.len()],
            done,
        }
    }
}

impl Iterator for Tuples<'_> {
    type Item = Vec<ElementId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tuple = self
            .positions
            .iter()
            .zip(self.nset)
            .map(|(&pos, subset)| subset[pos])
            .collect();

        // Advance, little-endian odometer
        let mut axis = 0;
        loop {
            if axis == self.positions.len() {
                self.done = true;
                break;
            }
            self.positions[axis] += 1;
            if self.positions[axis] < self.nset[axis].len() {
                break;
            }
            self.positions[axis] = 0;
            axis += 1;
        }
        Some(tuple)
    }
}
