//! A whole run: read, preprocess, climb in parallel, select, write.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::modifier::{ModifiedPattern, Modifier};
use crate::output::{open_output, PatternSink, PatternWriter};
use crate::pool::{default_patterns, PatternPool};
use crate::reader::{PatternReader, TupleReader};
use crate::selection;
use crate::tensor::{preprocess, Preprocessed, Storage};
use crate::visited::VisitedPatterns;

/// What a run did
#[derive(Clone, Debug)]
pub struct Summary {
    pub storage: Storage,
    pub initial_patterns: usize,
    /// Local optima found (and written, without selection)
    pub candidates: usize,
    pub selected: usize,
    pub evicted: usize,
    pub load_time: Duration,
    pub modify_time: Duration,
    pub select_time: Duration,
}

/// Runs `config` from its input files to its output file.
pub fn run(config: &Config) -> Result<Summary> {
    config.validate()?;
    let started = Instant::now();
    let raw = TupleReader::new(
        &config.separators.tensor_dimension,
        &config.separators.tensor_element,
        config.boolean,
    )
    .read_path(&config.tensor_path)?;
    let preprocessed = preprocess(raw, config.shift, config.density_threshold)?;
    let load_time = started.elapsed();
    info!(?load_time, "tensor loaded");
    let out = open_output(&config.output_path)?;
    let mut writer = PatternWriter::new(out, &preprocessed.context, &config.output);
    let mut summary = mine(config, &preprocessed, &mut writer)?;
    summary.load_time = load_time;
    Ok(summary)
}

#[derive(Default)]
struct Harvest {
    candidates: Vec<ModifiedPattern>,
    emitted: usize,
}

/// Climbs from the initial patterns and sends the result to `sink`: the
/// selected patterns, or every local optimum as soon as it is found when
/// `config.no_selection` holds.
pub fn mine<S: PatternSink>(config: &Config, preprocessed: &Preprocessed, sink: &mut S) -> Result<Summary> {
    let Preprocessed {
        tensor,
        context,
        positive_tuples,
    } = preprocessed;
    let started = Instant::now();
    let pool = PatternPool::new();
    let visited = VisitedPatterns::new(config.dedup, tensor.cardinalities());
    let modifier = Modifier::new(tensor, &visited, config.grow, config.intermediary);
    let stop_progress = AtomicBool::new(false);

    let (initial_patterns, harvest) = {
        let direct = config.no_selection.then(|| Mutex::new(&mut *sink));
        let (pool, modifier, direct, stop_progress) = (&pool, &modifier, direct.as_ref(), &stop_progress);
        thread::scope(|scope| {
            let workers: Vec<_> = (0..config.jobs)
                .map(|_| {
                    scope.spawn(move || -> Result<Harvest> {
                        let mut harvest = Harvest::default();
                        while let Some(initial) = pool.next() {
                            let found = modifier.modify(initial);
                            match direct {
                                Some(sink) => {
                                    for pattern in &found {
                                        let density = pattern.sum as f64 / pattern.area as f64;
                                        sink.lock()
                                            .emit(&pattern.nset, context.to_membership(density), None)?;
                                    }
                                    harvest.emitted += found.len();
                                }
                                None => harvest.candidates.extend(found),
                            }
                        }
                        Ok(harvest)
                    })
                })
                .collect();
            let progress = config
                .progress
                .map(|period| scope.spawn(move || report_progress(pool, stop_progress, period)));

            let fed = match &config.pattern_path {
                Some(path) => PatternReader::new(
                    context,
                    &config.separators.pattern_dimension,
                    &config.separators.pattern_element,
                )
                .read_path(path, config.max_patterns, |nset| pool.add_pattern(nset)),
                None => {
                    let patterns = default_patterns(positive_tuples, config.max_patterns, &mut rand::rng());
                    let count = patterns.len();
                    patterns.into_iter().for_each(|nset| pool.add_pattern(nset));
                    Ok(count)
                }
            };
            pool.all_patterns_added();

            let mut failure: Option<Error> = None;
            let mut harvest = Harvest::default();
            for worker in workers {
                match worker.join() {
                    Ok(Ok(found)) => {
                        harvest.candidates.extend(found.candidates);
                        harvest.emitted += found.emitted;
                    }
                    Ok(Err(error)) => {
                        failure.get_or_insert(error);
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            stop_progress.store(true, Ordering::Relaxed);
            if let Some(progress) = progress {
                progress.thread().unpark();
                if let Err(payload) = progress.join() {
                    panic::resume_unwind(payload);
                }
            }
            match (fed, failure) {
                (Err(error), _) | (Ok(_), Some(error)) => Err(error),
                (Ok(count), None) => Ok((count, harvest)),
            }
        })?
    };
    let modify_time = started.elapsed();
    info!(
        initial_patterns,
        local_optima = harvest.candidates.len() + harvest.emitted,
        visited = visited.len(),
        ?modify_time,
        "modification done"
    );

    let mut summary = Summary {
        storage: context.storage(),
        initial_patterns,
        candidates: harvest.candidates.len() + harvest.emitted,
        selected: 0,
        evicted: 0,
        load_time: Duration::ZERO,
        modify_time,
        select_time: Duration::ZERO,
    };
    if !config.no_selection {
        let started = Instant::now();
        let ranking = selection::rank(
            tensor,
            context,
            harvest.candidates.into_iter().map(|pattern| pattern.nset).collect(),
            config.criterion,
            config.max_selection_size,
        );
        let squared_unit = context.unit() * context.unit();
        for selected in &ranking.selected {
            sink.emit(
                &selected.pattern,
                context.to_membership(selected.density as f64),
                Some(selected.rss / squared_unit),
            )?;
        }
        summary.selected = ranking.selected.len();
        summary.evicted = ranking.evicted.len();
        summary.select_time = started.elapsed();
        info!(select_time = ?summary.select_time, "patterns written");
    }
    sink.flush()?;
    Ok(summary)
}

/// Prints the advisory pending count every `period` until `stop` is set.
fn report_progress(pool: &PatternPool, stop: &AtomicBool, period: Duration) {
    while !stop.load(Ordering::Relaxed) {
        thread::park_timeout(period);
        if stop.load(Ordering::Relaxed) {
            break;
        }
        eprint!("\rStill {} patterns to start modifying", pool.remaining());
    }
    eprintln!("\rModifying patterns: done.                    ");
}
