//! Property tests for the stepwise selection
//!
//! Every accepted step beats the penalty of its criterion, the recorded
//! RSS matches the max-plate model rebuilt from scratch, and no remaining
//! candidate would lower it further.


use generators::{arb_tensor_and_patterns, TensorParams};
use nclusterbox::config::Criterion;
use nclusterbox::pattern::NSet;
use nclusterbox::selection::rank;
use nclusterbox::tensor::PredictionTensor;
use proptest::prelude::*;

fn close(a: f64, b: f64, scale: f64) -> bool {
    (a - b).abs() <= 1e-9 * scale.max(1.0)
}

fn arb_criterion() -> impl Strategy<Value = Criterion> {
    prop_oneof![Just(Criterion::Rss), Just(Criterion::Aic), Just(Criterion::Bic)]
}

// ============================================================================
// Selection
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Accepted steps never increase the RSS
    #[test]
    fn rss_history_decreases(
        (pre, patterns) in arb_tensor_and_patterns(TensorParams::default(), 1..=6),
        criterion in arb_criterion(),
    ) {
        let ranking = rank(&pre.tensor, &pre.context, patterns, criterion, None);
        let mut previous = pre.context.null_model_rss_fixed();
        for selected in &ranking.selected {
            prop_assert!(selected.density > 0);
            prop_assert!(selected.rss <= previous);
            previous = selected.rss;
        }
    }

    /// Each step divides the RSS before it by more than the penalty:
    /// `rss_after / rss_before < 1 + multiplier`
    #[test]
    fn accepted_steps_beat_the_penalty(
        (pre, patterns) in arb_tensor_and_patterns(TensorParams::default(), 1..=6),
        criterion in arb_criterion(),
    ) {
        let ranking = rank(&pre.tensor, &pre.context, patterns, criterion, None);
        let ratio = 1.0 + criterion.rss_multiplier(pre.context.area());
        let mut before = pre.context.null_model_rss_fixed();
        for selected in &ranking.selected {
            prop_assert!(selected.rss < ratio * before + 1e-9 * before.max(1.0));
            before = selected.rss;
        }
    }

    /// The recorded RSS decreases match the model rebuilt from scratch
    #[test]
    fn rss_history_matches_model(
        (pre, patterns) in arb_tensor_and_patterns(TensorParams::default(), 1..=6),
    ) {
        let ranking = rank(&pre.tensor, &pre.context, patterns.clone(), Criterion::Rss, None);
        let mut model = PredictionTensor::new(&pre.tensor, &patterns);
        let empty = model.rss() as f64;
        let null_model_rss = pre.context.null_model_rss_fixed();
        for selected in &ranking.selected {
            let projected = model.project(&selected.pattern).unwrap();
            model.add_pattern(&projected, selected.density);
            let decrease = empty - model.rss() as f64;
            prop_assert!(close(null_model_rss - selected.rss, decrease, null_model_rss.max(empty)));
        }
    }

    /// Under the RSS criterion, no remaining candidate lowers the RSS
    #[test]
    fn no_remaining_candidate_improves(
        (pre, patterns) in arb_tensor_and_patterns(TensorParams::default(), 1..=6),
    ) {
        let ranking = rank(&pre.tensor, &pre.context, patterns.clone(), Criterion::Rss, None);
        let mut model = PredictionTensor::new(&pre.tensor, &patterns);
        for selected in &ranking.selected {
            let projected = model.project(&selected.pattern).unwrap();
            model.add_pattern(&projected, selected.density);
        }
        let mut accounted: Vec<NSet> = ranking
            .selected
            .iter()
            .map(|selected| selected.pattern.clone())
            .chain(ranking.evicted.iter().cloned())
            .collect();
        for candidate in &patterns {
            if let Some(position) = accounted.iter().position(|nset| nset == candidate) {
                accounted.swap_remove(position);
                continue;
            }
            let density = pre.tensor.density(candidate);
            if density > 0 {
                let projected = model.project(candidate).unwrap();
                prop_assert!(model.delta_adding(&projected, density) <= 0);
            }
        }
    }

    /// The selection never exceeds its bound
    #[test]
    fn selection_size_is_bounded(
        (pre, patterns) in arb_tensor_and_patterns(TensorParams::default(), 1..=6),
        max in 1usize..3,
        criterion in arb_criterion(),
    ) {
        let ranking = rank(&pre.tensor, &pre.context, patterns, criterion, Some(max));
        prop_assert!(ranking.selected.len() <= max);
    }
}
