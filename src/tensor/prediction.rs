//! Projection of a tensor on the elements of a set of patterns, with the
//! prediction of a selection of patterns at every entry.
//!
//! The prediction at an entry is the highest density among the selected
//! patterns covering it (0 when none does). Each entry also remembers the
//! prediction it would have without its densest pattern, which prices the
//! removal of a selected pattern.

use super::Tensor;
use crate::pattern::{ElementId, NSet};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Entry {
    real: i64,
    estimated: i64,
    /// Prediction if the densest covering pattern were removed
    second: i64,
}

fn square(x: i64) -> i128 {
    let x = i128::from(x);
    x * x
}

#[derive(Clone, Debug)]
pub struct PredictionTensor {
    /// Original ids kept on every axis, sorted; the new id is the position
    kept: Vec<Vec<ElementId>>,
    old_to_new: Vec<Vec<Option<ElementId>>>,
    strides: Vec<usize>,
    entries: Vec<Entry>,
}

impl PredictionTensor {
    /// Projection of `tensor` on the elements occurring in `patterns`.
    pub fn new<'a>(tensor: &Tensor, patterns: impl IntoIterator<Item = &'a NSet>) -> Self {
        let cardinalities = tensor.cardinalities();
        let mut occurs: Vec<Vec<bool>> = cardinalities.iter().map(|&c| vec![false; c]).collect();
        for nset in patterns {
            for (axis, subset) in nset.iter().enumerate() {
                for &id in subset {
                    occurs[axis][id as usize] = true;
                }
            }
        }
        let kept: Vec<Vec<ElementId>> = occurs
            .iter()
            .map(|axis| {
                axis.iter()
                    .enumerate()
                    .filter(|(_, &present)| present)
                    .map(|(id, _)| id as ElementId)
                    .collect()
            })
            .collect();
        let old_to_new = kept
            .iter()
            .zip(cardinalities)
            .map(|(ids, &card)| {
                let mut map = vec![None; card];
                for (new, &old) in ids.iter().enumerate() {
                    map[old as usize] = Some(new as ElementId);
                }
                map
            })
            .collect();

        let sizes: Vec<usize> = kept.iter().map(Vec::len).collect();
        let mut strides = vec![1; sizes.len()];
        for axis in (0..sizes.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * sizes[axis + 1];
        }
        let area: usize = sizes.iter().product();
        let mut entries = Vec::with_capacity(area);
        let mut position = vec![0usize; sizes.len()];
        let mut tuple: Vec<ElementId> = vec![0; sizes.len()];
        for _ in 0..area {
            for ((id, &pos), ids) in tuple.iter_mut().zip(&position).zip(&kept) {
                *id = ids[pos];
            }
            entries.push(Entry {
                real: tensor.value(&tuple),
                ..Entry::default()
            });
            for (pos, &size) in position.iter_mut().zip(&sizes).rev() {
                *pos += 1;
                if *pos < size {
                    break;
                }
                *pos = 0;
            }
        }
        Self {
            kept,
            old_to_new,
            strides,
            entries,
        }
    }

    /// Cardinalities of the projection
    pub fn cardinalities(&self) -> Vec<usize> {
        self.kept.iter().map(Vec::len).collect()
    }

    /// Pattern in projected ids; `None` if some element was not kept.
    pub fn project(&self, nset: &[Vec<ElementId>]) -> Option<NSet> {
        nset.iter()
            .zip(&self.old_to_new)
            .map(|(subset, map)| {
                subset
                    .iter()
                    .map(|&id| map.get(id as usize).copied().flatten())
                    .collect::<Option<Vec<_>>>()
            })
            .collect()
    }

    /// Pattern back in the ids of the original tensor
    pub fn restore(&self, projected: &[Vec<ElementId>]) -> NSet {
        projected
            .iter()
            .zip(&self.kept)
            .map(|(subset, ids)| subset.iter().map(|&id| ids[id as usize]).collect())
            .collect()
    }

    fn for_each_entry(&self, nset: &[Vec<ElementId>], mut f: impl FnMut(&Entry)) {
        visit(&self.strides, nset, 0, &mut |index| f(&self.entries[index]));
    }

    /// RSS decrease from raising the predictions on `nset` to `density`.
    /// It is also what a candidate overlapping a newly selected pattern on
    /// `nset` loses of its own RSS decrease, `density` being the lower of
    /// the two densities.
    pub fn delta_adding(&self, nset: &[Vec<ElementId>], density: i64) -> i128 {
        let mut delta = 0;
        self.for_each_entry(nset, |entry| {
            if density > entry.estimated {
                delta += square(entry.estimated - entry.real) - square(density - entry.real);
            }
        });
        delta
    }

    /// Change, on `nset`, of the removal price of a selected pattern of
    /// density `previous` once a sparser pattern of density `last` is added.
    pub fn delta_removing_if_sparser_selected(&self, nset: &[Vec<ElementId>], previous: i64, last: i64) -> i128 {
        let mut delta = 0;
        self.for_each_entry(nset, |entry| {
            if entry.estimated == previous && last > entry.second {
                delta += square(entry.second - entry.real) - square(last - entry.real);
            }
        });
        delta
    }

    /// Same as above when the added pattern is at least as dense.
    pub fn delta_removing_if_denser_selected(&self, nset: &[Vec<ElementId>], previous: i64) -> i128 {
        let mut delta = 0;
        self.for_each_entry(nset, |entry| {
            if entry.estimated == previous {
                delta += square(entry.second - entry.real) - square(previous - entry.real);
            }
        });
        delta
    }

    /// Adds a selected pattern to the prediction model.
    pub fn add_pattern(&mut self, nset: &[Vec<ElementId>], density: i64) {
        let entries = &mut self.entries;
        visit(&self.strides, nset, 0, &mut |index| {
            let entry = &mut entries[index];
            if density > entry.estimated {
                entry.second = entry.estimated;
                entry.estimated = density;
            } else if density > entry.second {
                entry.second = density;
            }
        });
    }

    /// Forgets every selected pattern.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.estimated = 0;
            entry.second = 0;
        }
    }

    /// Residual sum of squares of the current prediction on the projection
    pub fn rss(&self) -> i128 {
        self.entries
            .iter()
            .map(|entry| square(entry.estimated - entry.real))
            .sum()
    }
}

fn visit(strides: &[usize], nset: &[Vec<ElementId>], base: usize, f: &mut impl FnMut(usize)) {
    match (strides.split_first(), nset.split_first()) {
        (Some((&stride, strides)), Some((subset, rest))) => {
            for &id in subset {
                visit(strides, rest, base + id as usize * stride, f);
            }
        }
        _ => f(base),
    }
}
