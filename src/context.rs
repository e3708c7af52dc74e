//! Tensor context: everything about the tensor that outlives preprocessing
//! apart from the values themselves.
//!
//! Axes are stored internally by increasing cardinality and the element
//! ids of each axis by increasing positive membership mass. The context
//! keeps both permutations so patterns can be printed with their labels
//! in the input's dimension order, and read back from label sets.

use indexmap::IndexSet;

use crate::pattern::{ElementId, NSet};
use crate::tensor::{ShiftModel, Storage};

#[derive(Clone, Debug)]
pub struct TensorContext {
    /// `labels[axis]` maps internal ids to labels, axis in internal order
    pub(crate) labels: Vec<IndexSet<String>>,
    pub(crate) external_to_internal: Vec<usize>,
    pub(crate) internal_to_external: Vec<usize>,
    pub(crate) unit: f64,
    /// Null-model residual sum of squares, in membership units
    pub(crate) null_model_rss: f64,
    pub(crate) shift: ShiftModel,
    pub(crate) is_crisp: bool,
    pub(crate) storage: Storage,
}

impl TensorContext {
    pub fn arity(&self) -> usize {
        self.labels.len()
    }

    /// Cardinalities in internal axis order
    pub fn cardinalities(&self) -> Vec<usize> {
        self.labels.iter().map(IndexSet::len).collect()
    }

    pub fn area(&self) -> f64 {
        self.labels.iter().map(|labels| labels.len() as f64).product()
    }

    /// Fixed-point scale: a membership `m` is stored as `round(m * unit)`
    pub fn unit(&self) -> f64 {
        self.unit
    }

    pub fn null_model_rss(&self) -> f64 {
        self.null_model_rss
    }

    /// Null-model RSS in squared fixed-point units
    pub fn null_model_rss_fixed(&self) -> f64 {
        self.null_model_rss * self.unit * self.unit
    }

    pub fn shift(&self) -> &ShiftModel {
        &self.shift
    }

    pub fn is_crisp(&self) -> bool {
        self.is_crisp
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn external_to_internal(&self) -> &[usize] {
        &self.external_to_internal
    }

    pub fn internal_to_external(&self) -> &[usize] {
        &self.internal_to_external
    }

    pub fn label(&self, axis: usize, id: ElementId) -> Option<&str> {
        self.labels
            .get(axis)?
            .get_index(id as usize)
            .map(String::as_str)
    }

    pub fn label_id(&self, axis: usize, label: &str) -> Option<ElementId> {
        self.labels.get(axis)?.get_index_of(label).map(|id| id as ElementId)
    }

    /// Labels of a pattern, axes in input order
    pub fn external_labels(&self, nset: &[Vec<ElementId>]) -> Vec<Vec<&str>> {
        self.external_to_internal
            .iter()
            .map(|&axis| {
                nset[axis]
                    .iter()
                    .filter_map(|&id| self.label(axis, id))
                    .collect()
            })
            .collect()
    }

    /// Pattern from labels given in input axis order; `None` if a label is
    /// unknown. Subsets come out sorted, duplicates merged.
    pub fn internal_pattern<S: AsRef<str>>(&self, external: &[Vec<S>]) -> Option<NSet> {
        if external.len() != self.arity() {
            return None;
        }
        let mut nset = vec![Vec::new(); self.arity()];
        for (labels, &axis) in external.iter().zip(&self.external_to_internal) {
            let mut subset = labels
                .iter()
                .map(|label| self.label_id(axis, label.as_ref()))
                .collect::<Option<Vec<_>>>()?;
            subset.sort_unstable();
            subset.dedup();
            nset[axis] = subset;
        }
        Some(nset)
    }

    /// Fixed-point value back to membership units
    pub fn to_membership(&self, fixed: f64) -> f64 {
        fixed / self.unit
    }
}
