//! Property tests for the tensor structure
//!
//! Sums on patterns and on their hyperplanes, computed by trie traversal
//! or incrementally, against naive enumeration.


use generators::{arb_raw_tensor, arb_tensor_and_pattern, cells, pattern_tuples, TensorParams};
use nclusterbox::config::ShiftMode;
use nclusterbox::pattern::{self, ElementId};
use nclusterbox::tensor::{preprocess, Tensor, Trie, TubeKind};
use proptest::prelude::*;

fn naive_sum(tensor: &Tensor, nset: &[Vec<ElementId>]) -> i64 {
    pattern_tuples(nset).iter().map(|tuple| tensor.value(tuple)).sum()
}

fn naive_hyperplane_sums(tensor: &Tensor, nset: &[Vec<ElementId>]) -> Vec<Vec<i64>> {
    tensor
        .cardinalities()
        .iter()
        .enumerate()
        .map(|(axis, &card)| {
            (0..card as ElementId)
                .map(|id| {
                    let mut slice = nset.to_vec();
                    slice[axis] = vec![id];
                    naive_sum(tensor, &slice)
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// Sums on Patterns
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Trie traversal agrees with enumeration, crisp tensors
    #[test]
    fn crisp_sum_matches_naive((pre, nset) in arb_tensor_and_pattern(TensorParams { crisp: true, ..Default::default() })) {
        prop_assert_eq!(pre.tensor.sum_on_pattern(&nset), naive_sum(&pre.tensor, &nset));
    }

    /// Trie traversal agrees with enumeration, fuzzy tensors
    #[test]
    fn fuzzy_sum_matches_naive((pre, nset) in arb_tensor_and_pattern(TensorParams::default())) {
        prop_assert_eq!(pre.tensor.sum_on_pattern(&nset), naive_sum(&pre.tensor, &nset));
    }

    /// Every hyperplane sum agrees with enumeration
    #[test]
    fn hyperplane_sums_match_naive((pre, nset) in arb_tensor_and_pattern(TensorParams::default())) {
        let (sum, sums) = pre.tensor.sums_on_pattern_and_hyperplanes(&nset);
        prop_assert_eq!(sum, naive_sum(&pre.tensor, &nset));
        prop_assert_eq!(sums, naive_hyperplane_sums(&pre.tensor, &nset));
    }

    /// Density is the sum over the area
    #[test]
    fn density_is_sum_over_area((pre, nset) in arb_tensor_and_pattern(TensorParams::default())) {
        let area = pattern::area(&nset) as i64;
        prop_assert_eq!(pre.tensor.density(&nset), pre.tensor.sum_on_pattern(&nset) / area);
    }
}

// ============================================================================
// Incremental Updates
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Inserting and erasing elements one at a time never drifts from a
    /// fresh computation
    #[test]
    fn incremental_sums_never_drift(
        (pre, mut nset) in arb_tensor_and_pattern(TensorParams { crisp: true, ..Default::default() }),
        steps in proptest::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 1..12),
    ) {
        let tensor = &pre.tensor;
        let (mut sum, mut sums) = tensor.sums_on_pattern_and_hyperplanes(&nset);
        for (axis, element) in steps {
            let axis = axis.index(nset.len());
            let element = element.index(tensor.cardinalities()[axis]) as ElementId;
            if nset[axis].contains(&element) {
                if nset[axis].len() == 1 {
                    continue;
                }
                sum -= sums[axis][element as usize];
                pattern::erase_sorted(&mut nset[axis], element);
                tensor.decrease_sums_on_hyperplanes(&nset, axis, element, &mut sums);
            } else {
                sum += sums[axis][element as usize];
                pattern::insert_sorted(&mut nset[axis], element);
                tensor.increase_sums_on_hyperplanes(&nset, axis, element, &mut sums);
            }
            let (fresh_sum, fresh_sums) = tensor.sums_on_pattern_and_hyperplanes(&nset);
            prop_assert_eq!(sum, fresh_sum);
            prop_assert_eq!(&sums, &fresh_sums);
        }
    }

    /// Same with fuzzy memberships
    #[test]
    fn fuzzy_incremental_sums_never_drift(
        (pre, mut nset) in arb_tensor_and_pattern(TensorParams::default()),
        steps in proptest::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 1..12),
    ) {
        let tensor = &pre.tensor;
        let (_, mut sums) = tensor.sums_on_pattern_and_hyperplanes(&nset);
        for (axis, element) in steps {
            let axis = axis.index(nset.len());
            let element = element.index(tensor.cardinalities()[axis]) as ElementId;
            if pattern::insert_sorted(&mut nset[axis], element) {
                tensor.increase_sums_on_hyperplanes(&nset, axis, element, &mut sums);
            } else if nset[axis].len() > 1 {
                pattern::erase_sorted(&mut nset[axis], element);
                tensor.decrease_sums_on_hyperplanes(&nset, axis, element, &mut sums);
            }
            prop_assert_eq!(&sums, &tensor.sums_on_pattern_and_hyperplanes(&nset).1);
        }
    }
}

// ============================================================================
// Storage Equivalence
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Dense and sparse storage hold the same values
    #[test]
    fn dense_and_sparse_agree(raw in arb_raw_tensor(TensorParams::default())) {
        let dense = preprocess(raw.clone(), ShiftMode::Mean, 0.0).unwrap();
        let sparse = preprocess(raw, ShiftMode::Mean, 1.0).unwrap();
        prop_assert_eq!(dense.tensor.cardinalities(), sparse.tensor.cardinalities());
        for cell in cells(dense.tensor.cardinalities()) {
            prop_assert_eq!(dense.tensor.value(&cell), sparse.tensor.value(&cell));
        }
    }

    /// Promoting sparse tubes to dense ones changes no sum
    #[test]
    fn tube_promotion_is_transparent(
        raw in arb_raw_tensor(TensorParams { max_cardinality: 8, ..Default::default() }),
        promote_at in 0usize..4,
    ) {
        let cardinalities: Vec<usize> = raw.labels.iter().map(|labels| labels.len()).collect();
        let mut never = Trie::empty(cardinalities.clone(), TubeKind::SparseFuzzy, 0, usize::MAX);
        let mut early = Trie::empty(cardinalities.clone(), TubeKind::SparseFuzzy, 0, promote_at);
        let mut crisp_never = Trie::empty(cardinalities.clone(), TubeKind::SparseCrisp, 7, usize::MAX);
        let mut crisp_early = Trie::empty(cardinalities.clone(), TubeKind::SparseCrisp, 7, promote_at);
        for tuple in &raw.tuples {
            let value = (tuple.membership * 100.0) as i32;
            never.set_tuple(&tuple.tuple, value);
            early.set_tuple(&tuple.tuple, value);
            crisp_never.set_tuple(&tuple.tuple, 0);
            crisp_early.set_tuple(&tuple.tuple, 0);
        }
        let full: Vec<Vec<ElementId>> = cardinalities.iter().map(|&c| (0..c as ElementId).collect()).collect();
        prop_assert_eq!(never.sum_on_pattern(&full), early.sum_on_pattern(&full));
        prop_assert_eq!(crisp_never.sum_on_pattern(&full), crisp_early.sum_on_pattern(&full));
        prop_assert_eq!(crisp_never.sum_on_pattern(&full), 7 * raw.tuples.len() as i64);
        for cell in cells(&cardinalities) {
            prop_assert_eq!(never.deviation(&cell), early.deviation(&cell));
            prop_assert_eq!(crisp_never.deviation(&cell), crisp_early.deviation(&cell));
        }
    }
}
