//! Hill climbing of patterns.
//!
//! A step inserts one absent element in, or erases one present element
//! from, one axis of the pattern. The step retained is the one maximizing
//! the explanatory power `g = sum * |sum| / area`, and only if it strictly
//! increases it. Per-hyperplane sums make every candidate step O(1) to
//! evaluate; they are updated incrementally after each step.

use tracing::trace;

use crate::pattern::{self, ElementId, NSet};
use crate::tensor::Tensor;
use crate::visited::VisitedPatterns;

/// A pattern reached by hill climbing, with its fixed-point sum
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModifiedPattern {
    pub nset: NSet,
    pub sum: i64,
    pub area: u64,
}

impl ModifiedPattern {
    pub fn density(&self) -> i64 {
        if self.area == 0 {
            return 0;
        }
        self.sum / self.area as i64
    }

    pub fn g(&self) -> f64 {
        explanatory_power(self.sum, self.area)
    }
}

pub fn explanatory_power(sum: i64, area: u64) -> f64 {
    let sum = sum as f64;
    sum * sum.abs() / area as f64
}

#[derive(Clone, Copy, Debug)]
struct Step {
    axis: usize,
    element: ElementId,
    insert: bool,
}

pub struct Modifier<'a> {
    tensor: &'a Tensor,
    visited: &'a VisitedPatterns,
    /// Never erase an element of the initial pattern
    grow: bool,
    /// Keep every pattern met, not only the local optimum
    intermediary: bool,
}

impl<'a> Modifier<'a> {
    pub fn new(tensor: &'a Tensor, visited: &'a VisitedPatterns, grow: bool, intermediary: bool) -> Self {
        Self {
            tensor,
            visited,
            grow,
            intermediary,
        }
    }

    /// Climbs from `initial` to a local optimum and returns it, or, when
    /// recording intermediary patterns, every pattern met from `initial` on.
    /// The climb stops at a pattern some climb already met, which is not
    /// returned.
    pub fn modify(&self, initial: NSet) -> Vec<ModifiedPattern> {
        if !self.grow && self.visited.visited(&initial) {
            return Vec::new();
        }
        let protected = self.grow.then(|| initial.clone());
        let mut nset = initial;
        let (mut sum, mut sums) = self.tensor.sums_on_pattern_and_hyperplanes(&nset);
        let mut area = pattern::area(&nset);
        let mut kept = Vec::new();
        if self.intermediary {
            kept.push(ModifiedPattern {
                nset: nset.clone(),
                sum,
                area,
            });
        }
        while let Some(step) = self.best_step(&nset, sum, area, &sums, protected.as_ref()) {
            let size = nset[step.axis].len() as u64;
            let element_sum = sums[step.axis][step.element as usize];
            if step.insert {
                pattern::insert_sorted(&mut nset[step.axis], step.element);
                sum += element_sum;
                area = area / size * (size + 1);
                self.tensor
                    .increase_sums_on_hyperplanes(&nset, step.axis, step.element, &mut sums);
            } else {
                pattern::erase_sorted(&mut nset[step.axis], step.element);
                sum -= element_sum;
                area = area / size * (size - 1);
                self.tensor
                    .decrease_sums_on_hyperplanes(&nset, step.axis, step.element, &mut sums);
            }
            trace!(
                axis = step.axis,
                element = step.element,
                insert = step.insert,
                g = explanatory_power(sum, area),
                "hill-climbing step"
            );
            if cfg!(debug_assertions) {
                let (fresh_sum, fresh_sums) = self.tensor.sums_on_pattern_and_hyperplanes(&nset);
                debug_assert_eq!(area, pattern::area(&nset));
                debug_assert_eq!(sum, fresh_sum);
                debug_assert_eq!(sums, fresh_sums);
            }
            if self.visited.visited(&nset) {
                return kept;
            }
            if self.intermediary {
                kept.push(ModifiedPattern {
                    nset: nset.clone(),
                    sum,
                    area,
                });
            }
        }
        if !self.intermediary {
            kept.push(ModifiedPattern { nset, sum, area });
        }
        kept
    }

    fn best_step(
        &self,
        nset: &[Vec<ElementId>],
        sum: i64,
        area: u64,
        sums: &[Vec<i64>],
        protected: Option<&NSet>,
    ) -> Option<Step> {
        let mut best_g = explanatory_power(sum, area);
        let mut best = None;
        let cardinalities = self.tensor.cardinalities();
        for (axis, (subset, axis_sums)) in nset.iter().zip(sums).enumerate() {
            let size = subset.len() as u64;
            if size > 1 {
                let sparsest = subset
                    .iter()
                    .copied()
                    .filter(|id| protected.map_or(true, |initial| initial[axis].binary_search(id).is_err()))
                    .min_by_key(|&id| axis_sums[id as usize]);
                if let Some(element) = sparsest {
                    let g = explanatory_power(sum - axis_sums[element as usize], area / size * (size - 1));
                    if g > best_g {
                        best_g = g;
                        best = Some(Step {
                            axis,
                            element,
                            insert: false,
                        });
                    }
                }
            }
            if (size as usize) < cardinalities[axis] {
                let densest = (0..cardinalities[axis] as ElementId)
                    .filter(|id| subset.binary_search(id).is_err())
                    .max_by_key(|&id| axis_sums[id as usize]);
                if let Some(element) = densest {
                    let g = explanatory_power(sum + axis_sums[element as usize], area / size * (size + 1));
                    if g > best_g {
                        best_g = g;
                        best = Some(Step {
                            axis,
                            element,
                            insert: true,
                        });
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupMode;
    use crate::tensor::{Trie, TubeKind};

    /// 3 x 3, +1 on the top-left 2 x 2 block, -1 elsewhere
    fn block() -> Tensor {
        let mut trie = Trie::empty(vec![3, 3], TubeKind::SparseCrisp, 2, 3);
        for tuple in [[0, 0], [0, 1], [1, 0], [1, 1]] {
            trie.set_tuple(&tuple, 0);
        }
        Tensor::new(trie, -1)
    }

    #[test]
    fn climbs_to_the_block() {
        let tensor = block();
        let visited = VisitedPatterns::new(DedupMode::Hashed, tensor.cardinalities());
        let modifier = Modifier::new(&tensor, &visited, false, false);
        let found = modifier.modify(vec![vec![0, 2], vec![0]]);
        assert_eq!(
            found,
            vec![ModifiedPattern {
                nset: vec![vec![0, 1], vec![0, 1]],
                sum: 4,
                area: 4,
            }]
        );
        assert_eq!(found[0].density(), 1);
        assert_eq!(found[0].g(), 4.0);
    }

    #[test]
    fn intermediary_keeps_every_step() {
        let tensor = block();
        let visited = VisitedPatterns::new(DedupMode::Disabled, tensor.cardinalities());
        let modifier = Modifier::new(&tensor, &visited, false, true);
        let steps: Vec<NSet> = modifier
            .modify(vec![vec![0, 2], vec![0]])
            .into_iter()
            .map(|modified| modified.nset)
            .collect();
        assert_eq!(
            steps,
            vec![
                vec![vec![0, 2], vec![0]],
                vec![vec![0], vec![0]],
                vec![vec![0, 1], vec![0]],
                vec![vec![0, 1], vec![0, 1]],
            ]
        );
    }

    #[test]
    fn grow_keeps_initial_elements() {
        let tensor = block();
        let visited = VisitedPatterns::new(DedupMode::Hashed, tensor.cardinalities());
        let modifier = Modifier::new(&tensor, &visited, true, false);
        let found = modifier.modify(vec![vec![0, 2], vec![0]]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nset, vec![vec![0, 1, 2], vec![0, 1]]);
        assert_eq!(found[0].sum, 2);
    }

    #[test]
    fn visited_patterns_are_abandoned() {
        let tensor = block();
        let visited = VisitedPatterns::new(DedupMode::Trie, tensor.cardinalities());
        let modifier = Modifier::new(&tensor, &visited, false, false);
        assert_eq!(modifier.modify(vec![vec![0], vec![1]]).len(), 1);
        // same start
        assert!(modifier.modify(vec![vec![0], vec![1]]).is_empty());
        // different start, same optimum
        assert!(modifier.modify(vec![vec![1], vec![0]]).is_empty());
    }
}
