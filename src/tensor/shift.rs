//! Null models: the baseline subtracted from every membership degree.

use crate::pattern::{ElementId, Tuples};

#[derive(Clone, Debug, PartialEq)]
pub enum ShiftModel {
    /// Same baseline everywhere
    Constant(f64),
    /// Baseline of a tuple = max average membership among the slices
    /// through it. `averages[axis][id]` is the average membership of the
    /// slice fixing `axis` to `id`.
    Expectation { averages: Vec<Vec<f64>> },
}

impl ShiftModel {
    /// Expectation model of a tensor given as (tuple, membership) pairs.
    pub fn expectation<'a>(
        cardinalities: &[usize],
        entries: impl IntoIterator<Item = (&'a [ElementId], f64)>,
    ) -> Self {
        let area: f64 = cardinalities.iter().map(|&c| c as f64).product();
        let mut averages: Vec<Vec<f64>> = cardinalities.iter().map(|&c| vec![0.0; c]).collect();
        for (tuple, membership) in entries {
            for (axis_averages, &id) in averages.iter_mut().zip(tuple) {
                axis_averages[id as usize] += membership;
            }
        }
        for (axis_averages, &cardinality) in averages.iter_mut().zip(cardinalities) {
            let slice_area = area / cardinality as f64;
            for average in axis_averages.iter_mut() {
                *average /= slice_area;
            }
        }
        ShiftModel::Expectation { averages }
    }

    pub fn shift(&self, tuple: &[ElementId]) -> f64 {
        match self {
            ShiftModel::Constant(shift) => *shift,
            ShiftModel::Expectation { averages } => averages
                .iter()
                .zip(tuple)
                .map(|(axis_averages, &id)| axis_averages[id as usize])
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Mean baseline over the tuples of a pattern.
    pub fn average_shift(&self, nset: &[Vec<ElementId>]) -> f64 {
        match self {
            ShiftModel::Constant(shift) => *shift,
            ShiftModel::Expectation { .. } => {
                let (mut total, mut count) = (0.0, 0u64);
                for tuple in Tuples::new(nset) {
                    total += self.shift(&tuple);
                    count += 1;
                }
                if count == 0 {
                    0.0
                } else {
                    total / count as f64
                }
            }
        }
    }

    /// Same model after reordering axes and ids: internal axis `i` is
    /// external axis `internal_to_external[i]`, and `new_to_old[e][new]`
    /// is the former id of `new` in external axis `e`.
    pub fn reordered(self, internal_to_external: &[usize], new_to_old: &[Vec<ElementId>]) -> Self {
        match self {
            ShiftModel::Constant(_) => self,
            ShiftModel::Expectation { averages } => ShiftModel::Expectation {
                averages: internal_to_external
                    .iter()
                    .map(|&external| {
                        new_to_old[external]
                            .iter()
                            .map(|&old| averages[external][old as usize])
                            .collect()
                    })
                    .collect(),
            },
        }
    }
}
