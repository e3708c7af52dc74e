//! Fixed-point fuzzy tensor with fast sums on patterns.
//!
//! Memberships are shifted by a null model and scaled by the context's
//! unit into integers. Every absent entry has the same value, the tensor
//! default; the [`Trie`] stores deviations from it and the sums below add
//! the default's contribution in closed form.
//!
//! - [`tube`]: the four leaf encodings
//! - [`trie`]: the hyperplane tree
//! - [`shift`]: null models
//! - [`builder`]: from parsed tuples to a `Tensor` and its context
//! - [`prediction`]: projection with per-tuple predictions, for selection

pub mod builder;
pub mod prediction;
pub mod shift;
pub mod trie;
pub mod tube;

pub use builder::{preprocess, FuzzyTuple, Preprocessed, RawTensor, Storage};
pub use prediction::PredictionTensor;
pub use shift::ShiftModel;
pub use trie::Trie;
pub use tube::{Tube, TubeKind};

use crate::pattern::{self, ElementId};

#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    trie: Trie,
    /// Fixed-point value of an absent entry
    default: i64,
}

impl Tensor {
    pub fn new(trie: Trie, default: i64) -> Self {
        Self { trie, default }
    }

    pub fn cardinalities(&self) -> &[usize] {
        self.trie.cardinalities()
    }

    pub fn arity(&self) -> usize {
        self.trie.cardinalities().len()
    }

    pub fn default_value(&self) -> i64 {
        self.default
    }

    /// Fixed-point shifted membership at `tuple`
    pub fn value(&self, tuple: &[ElementId]) -> i64 {
        self.default + self.trie.deviation(tuple)
    }

    pub fn sum_on_pattern(&self, nset: &[Vec<ElementId>]) -> i64 {
        self.trie.sum_on_pattern(nset) + self.default * pattern::area(nset) as i64
    }

    /// Sum on the pattern divided by its area
    pub fn density(&self, nset: &[Vec<ElementId>]) -> i64 {
        let area = pattern::area(nset) as i64;
        if area == 0 {
            return 0;
        }
        self.sum_on_pattern(nset) / area
    }

    /// Sum on the pattern and, for every axis k and every id of axis k,
    /// the sum on the pattern with axis k replaced by that id alone.
    pub fn sums_on_pattern_and_hyperplanes(&self, nset: &[Vec<ElementId>]) -> (i64, Vec<Vec<i64>>) {
        let mut sums: Vec<Vec<i64>> = self.cardinalities().iter().map(|&c| vec![0; c]).collect();
        let raw = self.trie.add_hyperplane_sums(nset, &mut sums, None, 1);
        let area = pattern::area(nset) as i64;
        if self.default != 0 {
            for (axis_sums, subset) in sums.iter_mut().zip(nset) {
                let correction = self.default * (area / subset.len() as i64);
                axis_sums.iter_mut().for_each(|sum| *sum += correction);
            }
        }
        (raw + self.default * area, sums)
    }

    /// Updates `sums` after `element` joined axis `axis` of the pattern.
    ///
    /// Only the other axes change: each gains the slice of the new element.
    /// Axis `axis` of `nset` is not read. The pattern sum grows by
    /// `sums[axis][element]`, which the caller already holds.
    pub fn increase_sums_on_hyperplanes(
        &self,
        nset: &[Vec<ElementId>],
        axis: usize,
        element: ElementId,
        sums: &mut [Vec<i64>],
    ) {
        self.shift_sums_on_hyperplanes(nset, axis, element, sums, 1);
    }

    /// Updates `sums` after `element` left axis `axis` of the pattern.
    pub fn decrease_sums_on_hyperplanes(
        &self,
        nset: &[Vec<ElementId>],
        axis: usize,
        element: ElementId,
        sums: &mut [Vec<i64>],
    ) {
        self.shift_sums_on_hyperplanes(nset, axis, element, sums, -1);
    }

    fn shift_sums_on_hyperplanes(
        &self,
        nset: &[Vec<ElementId>],
        axis: usize,
        element: ElementId,
        sums: &mut [Vec<i64>],
        sign: i64,
    ) {
        let singleton = [element];
        let slice: Vec<&[ElementId]> = nset
            .iter()
            .enumerate()
            .map(|(k, subset)| if k == axis { &singleton[..] } else { subset.as_slice() })
            .collect();
        self.trie.add_hyperplane_sums(&slice, sums, Some(axis), sign);
        if self.default != 0 {
            let slice_area: i64 = slice.iter().map(|subset| subset.len() as i64).product();
            for (k, axis_sums) in sums.iter_mut().enumerate() {
                if k != axis {
                    let correction = sign * self.default * (slice_area / slice[k].len() as i64);
                    axis_sums.iter_mut().for_each(|sum| *sum += correction);
                }
            }
        }
    }
}
