//! Hyperplane tree over tubes.
//!
//! A node at depth k is a hyperplane indexed by the ids of axis k; the
//! nodes at depth n-1 are tubes along the last axis. All values are
//! deviations from the tensor default (see [`super::Tensor`]), so the
//! traversals here return raw deviation sums.

use super::tube::{Tube, TubeKind};
use crate::pattern::ElementId;

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Hyperplane(Vec<Node>),
    Tube(Tube),
}

impl Node {
    fn empty(cardinalities: &[usize], kind: TubeKind) -> Self {
        match cardinalities {
            [last] => Node::Tube(Tube::empty(kind, *last)),
            [first, rest @ ..] => {
                Node::Hyperplane((0..*first).map(|_| Node::empty(rest, kind)).collect())
            }
            [] => Node::Hyperplane(Vec::new()),
        }
    }

    /// `values` holds the node's entries, last axis varying fastest.
    fn from_dense(cardinalities: &[usize], values: &[i32]) -> Self {
        match cardinalities {
            [_] => Node::Tube(Tube::DenseFuzzy(values.to_vec())),
            [_, rest @ ..] => {
                let stride: usize = rest.iter().product();
                Node::Hyperplane(
                    values
                        .chunks(stride.max(1))
                        .map(|chunk| Node::from_dense(rest, chunk))
                        .collect(),
                )
            }
            [] => Node::Hyperplane(Vec::new()),
        }
    }

    fn sum_on_pattern<S: AsRef<[ElementId]>>(&self, subsets: &[S], step: i64) -> i64 {
        match self {
            Node::Hyperplane(children) => subsets[0]
                .as_ref()
                .iter()
                .map(|&id| children[id as usize].sum_on_pattern(&subsets[1..], step))
                .sum(),
            Node::Tube(tube) => tube.sum_on(subsets[0].as_ref(), step),
        }
    }

    /// Adds `sign` times the hyperplane sums below this node into `sums`
    /// (one vector per remaining axis) and returns the raw sum on the
    /// pattern. The axis `skip` (relative to this node) is restricted to
    /// its subset and its own vector is left untouched.
    fn add_hyperplane_sums<S: AsRef<[ElementId]>>(
        &self,
        subsets: &[S],
        sums: &mut [Vec<i64>],
        skip: Option<usize>,
        sign: i64,
        step: i64,
    ) -> i64 {
        let Some((own, deeper)) = sums.split_first_mut() else {
            return 0;
        };
        let subset = subsets[0].as_ref();
        match self {
            Node::Hyperplane(children) => {
                let rest = &subsets[1..];
                if skip == Some(0) {
                    return subset
                        .iter()
                        .map(|&id| {
                            children[id as usize].add_hyperplane_sums(rest, deeper, None, sign, step)
                        })
                        .sum();
                }
                let child_skip = skip.map(|axis| axis - 1);
                let mut total = 0;
                let mut present = subset.iter().peekable();
                for (id, child) in children.iter().enumerate() {
                    if present.peek().is_some_and(|&&next| next as usize == id) {
                        present.next();
                        let sum = child.add_hyperplane_sums(rest, deeper, child_skip, sign, step);
                        own[id] += sign * sum;
                        total += sum;
                    } else {
                        own[id] += sign * child.sum_on_pattern(rest, step);
                    }
                }
                total
            }
            Node::Tube(tube) => {
                if skip != Some(0) {
                    tube.add_to_sums(own, step, sign);
                }
                tube.sum_on(subset, step)
            }
        }
    }

    fn tube_mut(&mut self, tuple: &[ElementId]) -> Option<&mut Tube> {
        match self {
            Node::Hyperplane(children) => children
                .get_mut(*tuple.first()? as usize)?
                .tube_mut(&tuple[1..]),
            Node::Tube(tube) => Some(tube),
        }
    }

    fn tube(&self, tuple: &[ElementId]) -> Option<&Tube> {
        match self {
            Node::Hyperplane(children) => children.get(*tuple.first()? as usize)?.tube(&tuple[1..]),
            Node::Tube(tube) => Some(tube),
        }
    }

    fn count_tubes(&self, counts: &mut [usize; 4]) {
        match self {
            Node::Hyperplane(children) => children.iter().for_each(|child| child.count_tubes(counts)),
            Node::Tube(tube) => {
                let slot = match tube.kind() {
                    TubeKind::SparseCrisp => 0,
                    TubeKind::DenseCrisp => 1,
                    TubeKind::SparseFuzzy => 2,
                    TubeKind::DenseFuzzy => 3,
                };
                counts[slot] += 1;
            }
        }
    }
}

/// Tree of hyperplanes whose leaves are tubes along the last axis
#[derive(Clone, Debug, PartialEq)]
pub struct Trie {
    root: Node,
    cardinalities: Vec<usize>,
    /// Deviation of a present entry in a crisp tube
    crisp_step: i64,
    /// Occupancy at which a sparse tube turns dense. Dense tubes ignore
    /// it, so a trie from [`Trie::from_dense`] only carries a placeholder.
    promote_at: usize,
}

impl Trie {
    /// Empty trie to be filled with [`Trie::set_tuple`].
    pub fn empty(cardinalities: Vec<usize>, kind: TubeKind, crisp_step: i64, promote_at: usize) -> Self {
        debug_assert!(cardinalities.len() >= 2);
        Self {
            root: Node::empty(&cardinalities, kind),
            cardinalities,
            crisp_step,
            promote_at,
        }
    }

    /// Dense fuzzy trie over `values`, in row-major order (last axis
    /// varying fastest).
    pub fn from_dense(cardinalities: Vec<usize>, values: &[i32]) -> Self {
        debug_assert!(cardinalities.len() >= 2);
        debug_assert_eq!(values.len(), cardinalities.iter().product::<usize>());
        let last = cardinalities.last().copied().unwrap_or(0);
        Self {
            root: Node::from_dense(&cardinalities, values),
            cardinalities,
            crisp_step: 0,
            // every tube is already dense
            promote_at: last,
        }
    }

    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }

    pub fn crisp_step(&self) -> i64 {
        self.crisp_step
    }

    /// Stores `deviation` at `tuple` (crisp tubes only record presence).
    pub fn set_tuple(&mut self, tuple: &[ElementId], deviation: i32) {
        let promote_at = self.promote_at;
        let last = self.cardinalities.last().copied().unwrap_or(0);
        if let (Some(tube), Some(&id)) = (self.root.tube_mut(tuple), tuple.last()) {
            tube.set(id, deviation, promote_at, last);
        }
    }

    /// Stored deviation at `tuple`
    pub fn deviation(&self, tuple: &[ElementId]) -> i64 {
        match (self.root.tube(tuple), tuple.last()) {
            (Some(tube), Some(&id)) => tube.deviation(id, self.crisp_step),
            _ => 0,
        }
    }

    /// Raw deviation sum on the pattern.
    pub fn sum_on_pattern<S: AsRef<[ElementId]>>(&self, subsets: &[S]) -> i64 {
        self.root.sum_on_pattern(subsets, self.crisp_step)
    }

    /// Adds `sign` times the raw hyperplane sums of the pattern into `sums`
    /// and returns its raw sum. When `skip` is set, that axis must hold a
    /// single element and its vector is not touched.
    pub fn add_hyperplane_sums<S: AsRef<[ElementId]>>(
        &self,
        subsets: &[S],
        sums: &mut [Vec<i64>],
        skip: Option<usize>,
        sign: i64,
    ) -> i64 {
        debug_assert_eq!(subsets.len(), self.cardinalities.len());
        debug_assert_eq!(sums.len(), self.cardinalities.len());
        self.root
            .add_hyperplane_sums(subsets, sums, skip, sign, self.crisp_step)
    }

    /// Number of tubes of each kind: sparse crisp, dense crisp, sparse
    /// fuzzy, dense fuzzy.
    pub fn tube_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        self.root.count_tubes(&mut counts);
        counts
    }
}
