//! Stepwise selection of the local optima.
//!
//! Forward selection adds, one at a time, the candidate decreasing the
//! residual sum of squares the most; after each addition the selected
//! patterns are checked for one that the new one made useless, which is
//! then evicted. A step is only taken if it beats the penalty of the
//! chosen criterion, relative to the RSS of the current selection.
//! Predictions follow the max-plate model of [`PredictionTensor`].

use tracing::{debug, info};

use crate::config::Criterion;
use crate::context::TensorContext;
use crate::pattern::{self, NSet};
use crate::tensor::{PredictionTensor, Tensor};

/// A local optimum competing for selection
#[derive(Clone, Debug)]
pub struct CandidateVariable {
    pub pattern: NSet,
    /// Fixed-point density
    pub density: i64,
    /// Fixed-point sum of the tensor on the pattern
    sum: i64,
    /// RSS change if this candidate were added (unselected) or removed
    /// (selected), given the other selected candidates
    rss_variation: i128,
}

impl CandidateVariable {
    pub fn new(pattern: NSet, density: i64, sum: i64) -> Self {
        let mut candidate = Self {
            pattern,
            density,
            sum,
            rss_variation: 0,
        };
        candidate.reset();
        candidate
    }

    pub fn rss_variation(&self) -> i128 {
        self.rss_variation
    }

    /// Variation when nothing else is selected, `density² * area - 2 *
    /// density * sum`, i.e. `-density² * area` up to the rounding of the
    /// density
    fn reset(&mut self) {
        let density = i128::from(self.density);
        let area = i128::from(pattern::area(&self.pattern));
        self.rss_variation = density * density * area - 2 * density * i128::from(self.sum);
    }
}

/// One selected pattern, in the ids of the tensor
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedPattern {
    pub pattern: NSet,
    pub density: i64,
    /// RSS of the model made of the patterns selected up to this one,
    /// in squared fixed-point units
    pub rss: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ranking {
    /// In selection order
    pub selected: Vec<SelectedPattern>,
    /// Patterns selected then discarded because later ones superseded them
    pub evicted: Vec<NSet>,
}

/// Selects, among `patterns`, the ones explaining the tensor best under
/// `criterion`. Patterns with a non-positive density never compete.
pub fn rank(
    tensor: &Tensor,
    context: &TensorContext,
    patterns: Vec<NSet>,
    criterion: Criterion,
    max_selection_size: Option<usize>,
) -> Ranking {
    let dense_enough: Vec<(NSet, i64, i64)> = patterns
        .into_iter()
        .filter_map(|nset| {
            let sum = tensor.sum_on_pattern(&nset);
            let density = sum / (pattern::area(&nset) as i64).max(1);
            (density > 0).then_some((nset, density, sum))
        })
        .collect();
    if dense_enough.is_empty() {
        return Ranking::default();
    }
    let prediction = PredictionTensor::new(tensor, dense_enough.iter().map(|(nset, _, _)| nset));
    let candidates = dense_enough
        .into_iter()
        .filter_map(|(nset, density, sum)| {
            prediction
                .project(&nset)
                .map(|projected| CandidateVariable::new(projected, density, sum))
        })
        .collect();
    let null_model_rss = context.null_model_rss_fixed();
    let multiplier = criterion.rss_multiplier(context.area());
    let mut selector = Selector {
        prediction,
        candidates,
        selected: 0,
        rss_history: vec![null_model_rss],
        evicted: Vec::new(),
    };
    selector.run(multiplier, max_selection_size);
    let ranking = selector.into_ranking();
    info!(
        selected = ranking.selected.len(),
        evicted = ranking.evicted.len(),
        ?criterion,
        "selection done"
    );
    ranking
}

struct Selector {
    prediction: PredictionTensor,
    /// `candidates[..selected]` are selected, in order
    candidates: Vec<CandidateVariable>,
    selected: usize,
    /// `rss_history[i]`: RSS with the first `i` selected patterns
    rss_history: Vec<f64>,
    evicted: Vec<NSet>,
}

/// Mutable access to two distinct candidates, `low < high`.
fn pair_mut(
    candidates: &mut [CandidateVariable],
    low: usize,
    high: usize,
) -> (&mut CandidateVariable, &mut CandidateVariable) {
    debug_assert!(low < high);
    let (head, tail) = candidates.split_at_mut(high);
    (&mut head[low], &mut tail[0])
}

impl Selector {
    /// Adds the best candidate while its variation is below `multiplier`
    /// times the current RSS. Before each addition, a selected pattern
    /// whose removal would then pass the same test, against the RSS after
    /// the addition, is evicted; the patterns selected after it become
    /// candidates again. The size bound only stops additions that evict
    /// nothing.
    fn run(&mut self, multiplier: f64, max_selection_size: Option<usize>) {
        loop {
            let current = self.current_rss();
            let Some(best) = self.best_unselected() else {
                break;
            };
            let variation = self.candidates[best].rss_variation as f64;
            if variation >= multiplier * current {
                break;
            }
            for previous in 0..self.selected {
                self.update_previously_selected(previous, best);
            }
            let removal_threshold = multiplier * (current + variation);
            if let Some(worst) = self.worst_selected() {
                if self.candidates[worst].rss_variation as f64 >= removal_threshold {
                    let evicted = self.candidates.swap_remove(worst);
                    debug!(position = worst, density = evicted.density, "pattern evicted");
                    self.evicted.push(evicted.pattern);
                    self.selected = worst;
                    self.reselect();
                    continue;
                }
            }
            if max_selection_size.is_some_and(|max| self.selected >= max) {
                break;
            }
            self.accept(best);
        }
    }

    fn current_rss(&self) -> f64 {
        self.rss_history.last().copied().unwrap_or(0.0)
    }

    /// Unselected candidate with the lowest variation, first on ties
    fn best_unselected(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for index in self.selected..self.candidates.len() {
            if best.map_or(true, |b| {
                self.candidates[index].rss_variation < self.candidates[b].rss_variation
            }) {
                best = Some(index);
            }
        }
        best
    }

    /// Selected candidate whose removal pays the most, last on ties
    fn worst_selected(&self) -> Option<usize> {
        let mut worst: Option<usize> = None;
        for index in 0..self.selected {
            if worst.map_or(true, |w| {
                self.candidates[index].rss_variation >= self.candidates[w].rss_variation
            }) {
                worst = Some(index);
            }
        }
        worst
    }

    fn accept(&mut self, best: usize) {
        self.candidates.swap(self.selected, best);
        let index = self.selected;
        self.record(index);
        for later in index + 1..self.candidates.len() {
            self.update_candidate(index, later);
        }
        let accepted = &self.candidates[index];
        self.prediction.add_pattern(&accepted.pattern, accepted.density);
        self.selected += 1;
    }

    fn record(&mut self, index: usize) {
        let rss = self.current_rss() + self.candidates[index].rss_variation as f64;
        debug!(position = index, density = self.candidates[index].density, rss, "pattern selected");
        self.rss_history.push(rss);
    }

    /// Rebuilds the bookkeeping of the selected prefix from scratch.
    fn reselect(&mut self) {
        self.prediction.reset();
        self.candidates.iter_mut().for_each(CandidateVariable::reset);
        self.rss_history.truncate(1);
        for index in 0..self.selected {
            for previous in 0..index {
                self.update_previously_selected(previous, index);
            }
            self.record(index);
            for later in index + 1..self.candidates.len() {
                self.update_candidate(index, later);
            }
            let replayed = &self.candidates[index];
            self.prediction.add_pattern(&replayed.pattern, replayed.density);
        }
    }

    /// Accounts for the selection of `selected` in the variation of the
    /// unselected candidate `candidate`.
    fn update_candidate(&mut self, selected: usize, candidate: usize) {
        let (selected, candidate) = pair_mut(&mut self.candidates, selected, candidate);
        if let Some(common) = pattern::intersection(&candidate.pattern, &selected.pattern) {
            let density = candidate.density.min(selected.density);
            candidate.rss_variation += self.prediction.delta_adding(&common, density);
        }
    }

    /// Accounts for the upcoming selection of `added` in the removal
    /// variation of the selected candidate `previous`.
    fn update_previously_selected(&mut self, previous: usize, added: usize) {
        let (previous, added) = pair_mut(&mut self.candidates, previous, added);
        if let Some(common) = pattern::intersection(&previous.pattern, &added.pattern) {
            previous.rss_variation += if added.density < previous.density {
                self.prediction
                    .delta_removing_if_sparser_selected(&common, previous.density, added.density)
            } else {
                self.prediction
                    .delta_removing_if_denser_selected(&common, previous.density)
            };
        }
    }

    fn into_ranking(self) -> Ranking {
        let Selector {
            prediction,
            mut candidates,
            selected,
            rss_history,
            evicted,
        } = self;
        candidates.truncate(selected);
        Ranking {
            selected: candidates
                .into_iter()
                .zip(rss_history.into_iter().skip(1))
                .map(|(candidate, rss)| SelectedPattern {
                    pattern: prediction.restore(&candidate.pattern),
                    density: candidate.density,
                    rss,
                })
                .collect(),
            evicted: evicted.iter().map(|nset| prediction.restore(nset)).collect(),
        }
    }
}
