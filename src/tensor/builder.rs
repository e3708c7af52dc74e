//! Preprocessing: from parsed tuples to the fixed-point [`Tensor`].
//!
//! The steps are:
//! 1. shift every membership by the null model;
//! 2. sort the axes by increasing cardinality and the ids of every axis by
//!    increasing positive mass;
//! 3. choose the unit so that no value or slice sum overflows an `i32`;
//! 4. pick the cheaper of the dense and sparse storages.

use std::fmt;

use indexmap::IndexSet;
use tracing::{debug, info};

use super::shift::ShiftModel;
use super::trie::Trie;
use super::tube::TubeKind;
use super::Tensor;
use crate::config::ShiftMode;
use crate::context::TensorContext;
use crate::error::{Error, Result};
use crate::pattern::ElementId;

/// One input tuple, ids in input axis order
#[derive(Clone, Debug, PartialEq)]
pub struct FuzzyTuple {
    pub tuple: Vec<ElementId>,
    pub membership: f64,
}

/// Parsed tensor: labels per input axis and the non-null tuples
#[derive(Clone, Debug)]
pub struct RawTensor {
    pub labels: Vec<IndexSet<String>>,
    pub tuples: Vec<FuzzyTuple>,
    /// Every membership is 1
    pub is_crisp: bool,
}

impl RawTensor {
    /// Drops null memberships, sorts the tuples (last axis most
    /// significant) and keeps the first occurrence of duplicates.
    pub fn new(labels: Vec<IndexSet<String>>, mut tuples: Vec<FuzzyTuple>) -> Self {
        tuples.retain(|t| t.membership != 0.0);
        tuples.sort_by(|a, b| a.tuple.iter().rev().cmp(b.tuple.iter().rev()));
        tuples.dedup_by(|later, earlier| later.tuple == earlier.tuple);
        let is_crisp = tuples.iter().all(|t| t.membership == 1.0);
        Self {
            labels,
            tuples,
            is_crisp,
        }
    }
}

/// Representation chosen for the tensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    DenseCrisp,
    SparseCrisp,
    DenseFuzzy,
    SparseFuzzy,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Storage::DenseCrisp => "dense crisp",
            Storage::SparseCrisp => "sparse crisp",
            Storage::DenseFuzzy => "dense fuzzy",
            Storage::SparseFuzzy => "sparse fuzzy",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct Preprocessed {
    pub tensor: Tensor,
    pub context: TensorContext,
    /// Tuples with a positive shifted membership, internal ids
    pub positive_tuples: Vec<(Vec<ElementId>, f64)>,
}

/// Builds the tensor and its context.
pub fn preprocess(raw: RawTensor, shift: ShiftMode, density_threshold: f64) -> Result<Preprocessed> {
    let n = raw.labels.len();
    if n < 2 {
        return Err(Error::usage(format!(
            "{n} dimension, but at least 2 are required!"
        )));
    }
    if raw.tuples.is_empty() {
        return Err(Error::usage("no tuple with a non-null membership degree!"));
    }
    let external_cardinalities: Vec<usize> = raw.labels.iter().map(IndexSet::len).collect();
    let area: f64 = external_cardinalities.iter().map(|&c| c as f64).product();

    let model = match shift {
        ShiftMode::Constant(shift) => ShiftModel::Constant(shift),
        ShiftMode::Mean => {
            ShiftModel::Constant(raw.tuples.iter().map(|t| t.membership).sum::<f64>() / area)
        }
        ShiftMode::Expectation => ShiftModel::expectation(
            &external_cardinalities,
            raw.tuples.iter().map(|t| (t.tuple.as_slice(), t.membership)),
        ),
    };
    let shifted: Vec<f64> = raw
        .tuples
        .iter()
        .map(|t| t.membership - model.shift(&t.tuple))
        .collect();

    // New ids by increasing positive mass, ties kept in input order
    let mut positive_mass: Vec<Vec<f64>> =
        external_cardinalities.iter().map(|&c| vec![0.0; c]).collect();
    for (t, &s) in raw.tuples.iter().zip(&shifted) {
        if s > 0.0 {
            for (mass, &id) in positive_mass.iter_mut().zip(&t.tuple) {
                mass[id as usize] += s;
            }
        }
    }
    let new_to_old: Vec<Vec<ElementId>> = positive_mass
        .iter()
        .map(|mass| {
            let mut order: Vec<ElementId> = (0..mass.len() as ElementId).collect();
            order.sort_by(|&a, &b| mass[a as usize].total_cmp(&mass[b as usize]));
            order
        })
        .collect();
    let old_to_new: Vec<Vec<ElementId>> = new_to_old
        .iter()
        .map(|order| {
            let mut inverse = vec![0; order.len()];
            for (new, &old) in order.iter().enumerate() {
                inverse[old as usize] = new as ElementId;
            }
            inverse
        })
        .collect();

    // Axes by increasing cardinality
    let mut internal_to_external: Vec<usize> = (0..n).collect();
    internal_to_external.sort_by_key(|&e| external_cardinalities[e]);
    let mut external_to_internal = vec![0; n];
    for (internal, &external) in internal_to_external.iter().enumerate() {
        external_to_internal[external] = internal;
    }
    let cardinalities: Vec<usize> = internal_to_external
        .iter()
        .map(|&e| external_cardinalities[e])
        .collect();

    let tuples: Vec<(Vec<ElementId>, f64)> = raw
        .tuples
        .iter()
        .zip(&shifted)
        .map(|(t, &s)| {
            let internal = internal_to_external
                .iter()
                .map(|&e| old_to_new[e][t.tuple[e] as usize])
                .collect();
            (internal, s)
        })
        .collect();
    let model = model.reordered(&internal_to_external, &new_to_old);
    let labels: Vec<IndexSet<String>> = internal_to_external
        .iter()
        .map(|&e| {
            new_to_old[e]
                .iter()
                .filter_map(|&old| raw.labels[e].get_index(old as usize).cloned())
                .collect()
        })
        .collect();

    let built = match &model {
        ShiftModel::Expectation { .. } => build_expectation(&cardinalities, &tuples, &model),
        ShiftModel::Constant(shift) => build_constant(
            &cardinalities,
            &tuples,
            *shift,
            raw.is_crisp,
            density_threshold,
        ),
    };
    info!(
        storage = %built.storage,
        tuples = tuples.len(),
        area,
        unit = built.unit,
        null_model_rss = built.null_model_rss,
        "tensor preprocessed"
    );
    debug!(?cardinalities, ?internal_to_external, "internal dimension order");

    let positive_tuples = tuples.into_iter().filter(|(_, s)| *s > 0.0).collect();
    let context = TensorContext {
        labels,
        external_to_internal,
        internal_to_external,
        unit: built.unit,
        null_model_rss: built.null_model_rss,
        shift: model,
        is_crisp: matches!(built.storage, Storage::DenseCrisp | Storage::SparseCrisp),
        storage: built.storage,
    };
    Ok(Preprocessed {
        tensor: built.tensor,
        context,
        positive_tuples,
    })
}

struct Built {
    tensor: Tensor,
    unit: f64,
    null_model_rss: f64,
    storage: Storage,
}

/// Positive and negative membership mass of every element, internal order
struct Masses {
    positive: Vec<Vec<f64>>,
    negative: Vec<Vec<f64>>,
}

impl Masses {
    fn new(cardinalities: &[usize], negative_start: impl Fn(usize) -> f64) -> Self {
        Self {
            positive: cardinalities.iter().map(|&c| vec![0.0; c]).collect(),
            negative: cardinalities
                .iter()
                .enumerate()
                .map(|(axis, &c)| vec![negative_start(axis); c])
                .collect(),
        }
    }

    fn max(&self) -> f64 {
        self.positive
            .iter()
            .chain(&self.negative)
            .flatten()
            .fold(0.0, |max: f64, &mass| max.max(mass))
    }
}

/// Largest unit keeping every fixed-point value and slice sum in `i32`.
fn unit_for(null_model_rss: f64, masses: &Masses) -> f64 {
    let rss_root = null_model_rss.sqrt();
    let rss_part = if rss_root > 1.0 { rss_root } else { 1.0 };
    f64::from(i32::MAX) / rss_part.max(masses.max())
}

fn fixed(value: f64, unit: f64) -> i64 {
    (value * unit).round() as i64
}

fn to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn flat_index(cardinalities: &[usize], tuple: &[ElementId]) -> usize {
    cardinalities
        .iter()
        .zip(tuple)
        .fold(0, |index, (&card, &id)| index * card + id as usize)
}

fn build_constant(
    cardinalities: &[usize],
    tuples: &[(Vec<ElementId>, f64)],
    shift: f64,
    is_crisp: bool,
    density_threshold: f64,
) -> Built {
    let n = cardinalities.len() as f64;
    let nb_of_tuples = tuples.len() as f64;
    let area: f64 = cardinalities.iter().map(|&c| c as f64).product();

    let null_model_rss = if is_crisp {
        (shift * area - 2.0 * nb_of_tuples) * shift + nb_of_tuples
    } else {
        shift * shift * (area - nb_of_tuples) + tuples.iter().map(|(_, s)| s * s).sum::<f64>()
    };
    let mut masses = Masses::new(cardinalities, |axis| {
        shift * (area / cardinalities[axis] as f64)
    });
    for (tuple, s) in tuples {
        for (axis, &id) in tuple.iter().enumerate() {
            if *s > 0.0 {
                masses.positive[axis][id as usize] += s;
                masses.negative[axis][id as usize] -= shift;
            } else {
                masses.negative[axis][id as usize] -= s + shift;
            }
        }
    }
    let unit = unit_for(null_model_rss, &masses);
    let default = fixed(-shift, unit);

    let dense = density_threshold == 0.0
        || if is_crisp {
            (8.0 * 8.0 + 1.0) * area < 8.0 * (3.0 * 8.0 + 4.0 * (n + 1.0) + 8.0) * nb_of_tuples
        } else {
            (4.0 + 8.0) * area < (3.0 * 8.0 + 4.0 * (n + 2.0) + 8.0) * nb_of_tuples
        };
    let last = cardinalities.last().copied().unwrap_or(0);

    let (tensor, storage) = match (is_crisp, dense) {
        (true, _) => {
            let step = fixed(1.0 - shift, unit) - default;
            let (kind, promote_at, storage) = if dense {
                (TubeKind::DenseCrisp, last, Storage::DenseCrisp)
            } else {
                let promote_at = (density_threshold * last as f64 / 32.0) as usize;
                (TubeKind::SparseCrisp, promote_at, Storage::SparseCrisp)
            };
            let mut trie = Trie::empty(cardinalities.to_vec(), kind, step, promote_at);
            for (tuple, _) in tuples {
                trie.set_tuple(tuple, 0);
            }
            (Tensor::new(trie, default), storage)
        }
        (false, true) => {
            let mut values = vec![to_i32(default); area as usize];
            for (tuple, s) in tuples {
                values[flat_index(cardinalities, tuple)] = to_i32(fixed(*s, unit));
            }
            let trie = Trie::from_dense(cardinalities.to_vec(), &values);
            (Tensor::new(trie, 0), Storage::DenseFuzzy)
        }
        (false, false) => {
            let promote_at = (density_threshold * last as f64 / 2.0) as usize;
            let mut trie = Trie::empty(cardinalities.to_vec(), TubeKind::SparseFuzzy, 0, promote_at);
            for (tuple, s) in tuples {
                trie.set_tuple(tuple, to_i32(fixed(*s, unit) - default));
            }
            (Tensor::new(trie, default), Storage::SparseFuzzy)
        }
    };
    Built {
        tensor,
        unit,
        null_model_rss,
        storage,
    }
}

/// Every entry gets its own baseline, so the tensor is stored densely.
fn build_expectation(
    cardinalities: &[usize],
    tuples: &[(Vec<ElementId>, f64)],
    model: &ShiftModel,
) -> Built {
    let area: usize = cardinalities.iter().product();
    let mut values = Vec::with_capacity(area);
    let mut cell: Vec<ElementId> = vec![0; cardinalities.len()];
    for _ in 0..area {
        values.push(-model.shift(&cell));
        advance(&mut cell, cardinalities);
    }
    for (tuple, s) in tuples {
        values[flat_index(cardinalities, tuple)] = *s;
    }

    let mut null_model_rss = 0.0;
    let mut masses = Masses::new(cardinalities, |_| 0.0);
    cell.iter_mut().for_each(|id| *id = 0);
    for &value in &values {
        null_model_rss += value * value;
        for (axis, &id) in cell.iter().enumerate() {
            if value > 0.0 {
                masses.positive[axis][id as usize] += value;
            } else {
                masses.negative[axis][id as usize] -= value;
            }
        }
        advance(&mut cell, cardinalities);
    }
    let unit = unit_for(null_model_rss, &masses);
    let fixed_values: Vec<i32> = values.iter().map(|&v| to_i32(fixed(v, unit))).collect();
    Built {
        tensor: Tensor::new(Trie::from_dense(cardinalities.to_vec(), &fixed_values), 0),
        unit,
        null_model_rss,
        storage: Storage::DenseFuzzy,
    }
}

/// Next cell in row-major order (last axis fastest); wraps to all zeros.
fn advance(cell: &mut [ElementId], cardinalities: &[usize]) {
    for (id, &card) in cell.iter_mut().zip(cardinalities).rev() {
        *id += 1;
        if (*id as usize) < card {
            return;
        }
        *id = 0;
    }
}
