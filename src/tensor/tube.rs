//! Tubes: the storage of one line of the tensor along its last axis.
//!
//! Every tube stores deviations from the tensor-wide default value, so an
//! absent entry always contributes 0. Crisp tubes only record presence;
//! the deviation of a present entry is the tensor's crisp step.

use roaring::RoaringBitmap;

use crate::pattern::ElementId;

#[derive(Clone, Debug, PartialEq)]
pub enum Tube {
    /// Sorted ids of the present entries
    SparseCrisp(Vec<ElementId>),
    /// Presence bitmap
    DenseCrisp(RoaringBitmap),
    /// Present entries sorted by id, with their deviations
    SparseFuzzy(Vec<(ElementId, i32)>),
    /// One deviation per element of the last axis
    DenseFuzzy(Vec<i32>),
}

/// Which tube a freshly created tensor starts with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TubeKind {
    SparseCrisp,
    DenseCrisp,
    SparseFuzzy,
    DenseFuzzy,
}

impl Tube {
    pub fn empty(kind: TubeKind, last_cardinality: usize) -> Self {
        match kind {
            TubeKind::SparseCrisp => Tube::SparseCrisp(Vec::new()),
            TubeKind::DenseCrisp => Tube::DenseCrisp(RoaringBitmap::new()),
            TubeKind::SparseFuzzy => Tube::SparseFuzzy(Vec::new()),
            TubeKind::DenseFuzzy => Tube::DenseFuzzy(vec![0; last_cardinality]),
        }
    }

    pub fn kind(&self) -> TubeKind {
        match self {
            Tube::SparseCrisp(_) => TubeKind::SparseCrisp,
            Tube::DenseCrisp(_) => TubeKind::DenseCrisp,
            Tube::SparseFuzzy(_) => TubeKind::SparseFuzzy,
            Tube::DenseFuzzy(_) => TubeKind::DenseFuzzy,
        }
    }

    /// Deviation at `id`
    pub fn deviation(&self, id: ElementId, step: i64) -> i64 {
        match self {
            Tube::SparseCrisp(ids) => {
                if ids.binary_search(&id).is_ok() {
                    step
                } else {
                    0
                }
            }
            Tube::DenseCrisp(bitmap) => {
                if bitmap.contains(id) {
                    step
                } else {
                    0
                }
            }
            Tube::SparseFuzzy(entries) => entries
                .binary_search_by_key(&id, |&(entry, _)| entry)
                .map_or(0, |pos| i64::from(entries[pos].1)),
            Tube::DenseFuzzy(values) => i64::from(values[id as usize]),
        }
    }

    /// Sum of the deviations at the ids of `subset` (sorted).
    pub fn sum_on(&self, subset: &[ElementId], step: i64) -> i64 {
        match self {
            Tube::SparseCrisp(ids) => count_common(ids, subset) as i64 * step,
            Tube::DenseCrisp(bitmap) => {
                subset.iter().filter(|&&id| bitmap.contains(id)).count() as i64 * step
            }
            Tube::SparseFuzzy(entries) => sum_common(entries, subset),
            Tube::DenseFuzzy(values) => subset.iter().map(|&id| i64::from(values[id as usize])).sum(),
        }
    }

    /// Adds `sign` times every deviation to the sums of the last axis.
    pub fn add_to_sums(&self, sums: &mut [i64], step: i64, sign: i64) {
        match self {
            Tube::SparseCrisp(ids) => {
                for &id in ids {
                    sums[id as usize] += sign * step;
                }
            }
            Tube::DenseCrisp(bitmap) => {
                for id in bitmap {
                    sums[id as usize] += sign * step;
                }
            }
            Tube::SparseFuzzy(entries) => {
                for &(id, value) in entries {
                    sums[id as usize] += sign * i64::from(value);
                }
            }
            Tube::DenseFuzzy(values) => {
                for (sum, &value) in sums.iter_mut().zip(values) {
                    *sum += sign * i64::from(value);
                }
            }
        }
    }

    /// Sets the entry at `id`. Crisp tubes ignore `deviation` and record
    /// presence. A sparse tube already holding `promote_at` entries turns
    /// dense before inserting a new one.
    pub fn set(&mut self, id: ElementId, deviation: i32, promote_at: usize, last_cardinality: usize) {
        match self {
            Tube::SparseCrisp(ids) => match ids.binary_search(&id) {
                Ok(_) => {}
                Err(pos) => {
                    if ids.len() >= promote_at {
                        let mut bitmap: RoaringBitmap = ids.iter().copied().collect();
                        bitmap.insert(id);
                        *self = Tube::DenseCrisp(bitmap);
                    } else {
                        ids.insert(pos, id);
                    }
                }
            },
            Tube::DenseCrisp(bitmap) => {
                bitmap.insert(id);
            }
            Tube::SparseFuzzy(entries) => {
                match entries.binary_search_by_key(&id, |&(entry, _)| entry) {
                    Ok(pos) => entries[pos].1 = deviation,
                    Err(pos) => {
                        if entries.len() >= promote_at {
                            let mut values = vec![0; last_cardinality];
                            for &(entry, value) in entries.iter() {
                                values[entry as usize] = value;
                            }
                            values[id as usize] = deviation;
                            *self = Tube::DenseFuzzy(values);
                        } else {
                            entries.insert(pos, (id, deviation));
                        }
                    }
                }
            }
            Tube::DenseFuzzy(values) => values[id as usize] = deviation,
        }
    }

    /// Number of stored entries (every position for a dense fuzzy tube)
    pub fn len(&self) -> usize {
        match self {
            Tube::SparseCrisp(ids) => ids.len(),
            Tube::DenseCrisp(bitmap) => bitmap.len() as usize,
            Tube::SparseFuzzy(entries) => entries.len(),
            Tube::DenseFuzzy(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Size of the intersection of two sorted id lists.
fn count_common(present: &[ElementId], subset: &[ElementId]) -> usize {
    if subset.len() * 8 < present.len() {
        return subset
            .iter()
            .filter(|id| present.binary_search(id).is_ok())
            .count();
    }
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < present.len() && j < subset.len() {
        match present[i].cmp(&subset[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

fn sum_common(entries: &[(ElementId, i32)], subset: &[ElementId]) -> i64 {
    if subset.len() * 8 < entries.len() {
        return subset
            .iter()
            .filter_map(|id| {
                entries
                    .binary_search_by_key(id, |&(entry, _)| entry)
                    .ok()
                    .map(|pos| i64::from(entries[pos].1))
            })
            .sum();
    }
    let (mut i, mut j, mut sum) = (0, 0, 0);
    while i < entries.len() && j < subset.len() {
        match entries[i].0.cmp(&subset[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += i64::from(entries[i].1);
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
