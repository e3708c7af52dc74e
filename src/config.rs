//! Run configuration.
//!
//! [`Config`] gathers every option of a run. The binary fills it from the
//! command line; library users build it directly, starting from
//! `Config::default()`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Penalty applied to the residual sum of squares during selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Criterion {
    Rss,
    Aic,
    #[default]
    Bic,
}

impl Criterion {
    /// Parses `rss`, `aic` or `bic`, or any non-empty prefix of them.
    pub fn parse(s: &str) -> Result<Self> {
        let candidates = [("rss", Criterion::Rss), ("aic", Criterion::Aic), ("bic", Criterion::Bic)];
        if !s.is_empty() {
            for (name, criterion) in candidates {
                if name.starts_with(s) {
                    return Ok(criterion);
                }
            }
        }
        Err(Error::usage(format!(
            "msc option should be either \"rss\", \"aic\" or \"bic\", not \"{s}\"!"
        )))
    }

    /// Multiplier m such that a step is worth taking iff it changes the RSS
    /// by less than m times the RSS of the current selection.
    pub fn rss_multiplier(self, area: f64) -> f64 {
        match self {
            Criterion::Rss => 0.0,
            Criterion::Aic => (-2.0 / area).exp() - 1.0,
            Criterion::Bic => (-area.ln() / area).exp() - 1.0,
        }
    }
}

/// Null model subtracted from every membership degree
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ShiftMode {
    /// Mean membership of the whole tensor
    #[default]
    Mean,
    /// User-supplied constant in [0, 1)
    Constant(f64),
    /// Per tuple: max average membership among the slices covering it
    Expectation,
}

/// Backing of the visited-pattern set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DedupMode {
    #[default]
    Hashed,
    Trie,
    Disabled,
}

/// Tokenizer character sets for the input files
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSeparators {
    pub tensor_dimension: String,
    pub tensor_element: String,
    pub pattern_dimension: String,
    pub pattern_element: String,
}

impl Default for InputSeparators {
    fn default() -> Self {
        Self {
            tensor_dimension: " ".to_string(),
            tensor_element: ",".to_string(),
            pattern_dimension: " ".to_string(),
            pattern_element: ",".to_string(),
        }
    }
}

/// What the output writer prints, and how
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFormat {
    pub dimension_separator: String,
    pub element_separator: String,
    /// Print densities in the shifted tensor instead of the input one
    pub print_shifted: bool,
    pub print_sizes: bool,
    pub size_prefix: String,
    pub size_separator: String,
    pub print_area: bool,
    pub area_prefix: String,
    pub print_rss: bool,
    pub rss_prefix: String,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            dimension_separator: " ".to_string(),
            element_separator: ",".to_string(),
            print_shifted: false,
            print_sizes: false,
            size_prefix: " : ".to_string(),
            size_separator: " ".to_string(),
            print_area: false,
            area_prefix: " : ".to_string(),
            print_rss: false,
            rss_prefix: " : ".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Tensor file, `-` for stdin
    pub tensor_path: PathBuf,
    /// Output file, `-` for stdout
    pub output_path: PathBuf,
    /// Input lines carry no membership column
    pub boolean: bool,
    pub max_patterns: Option<usize>,
    pub jobs: usize,
    /// 0 stores everything densely, 1 minimizes memory
    pub density_threshold: f64,
    pub criterion: Criterion,
    pub max_selection_size: Option<usize>,
    /// Output local optima directly, without selection
    pub no_selection: bool,
    pub shift: ShiftMode,
    /// Initial patterns; singletons of the positive tuples when absent
    pub pattern_path: Option<PathBuf>,
    pub grow: bool,
    pub intermediary: bool,
    pub dedup: DedupMode,
    pub separators: InputSeparators,
    pub output: OutputFormat,
    /// Period of the progress display, if any
    pub progress: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tensor_path: PathBuf::from("-"),
            output_path: PathBuf::from("-"),
            boolean: false,
            max_patterns: None,
            jobs: default_jobs(),
            density_threshold: 1.0,
            criterion: Criterion::default(),
            max_selection_size: None,
            no_selection: false,
            shift: ShiftMode::default(),
            pattern_path: None,
            grow: false,
            intermediary: false,
            dedup: DedupMode::default(),
            separators: InputSeparators::default(),
            output: OutputFormat::default(),
            progress: None,
        }
    }
}

/// Hardware concurrency, at least 1
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    /// Rejects out-of-range values and incompatible options.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(Error::usage("jobs option should provide a positive integer!"));
        }
        if self.max_patterns == Some(0) {
            return Err(Error::usage("max option should provide a positive integer!"));
        }
        if self.max_selection_size == Some(0) {
            return Err(Error::usage("mss option should provide a positive integer!"));
        }
        if !(0.0..=1.0).contains(&self.density_threshold) {
            return Err(Error::usage("density should be in [0, 1]!"));
        }
        if let ShiftMode::Constant(shift) = self.shift {
            if !(0.0..1.0).contains(&shift) {
                return Err(Error::usage("shift should be in [0, 1)!"));
            }
        }
        if self.no_selection && self.output.print_rss {
            return Err(Error::usage(
                "pr option requires a selection, it cannot be used with ns!",
            ));
        }
        if self.no_selection && self.max_selection_size.is_some() {
            return Err(Error::usage("mss option requires a selection, it cannot be used with ns!"));
        }
        for (name, set) in [
            ("tds", &self.separators.tensor_dimension),
            ("tes", &self.separators.tensor_element),
            ("pds", &self.separators.pattern_dimension),
            ("pes", &self.separators.pattern_element),
        ] {
            if set.is_empty() {
                return Err(Error::usage(format!("{name} option should provide at least one character!")));
            }
        }
        if let Some(period) = self.progress {
            if period.is_zero() {
                return Err(Error::usage("verbose option should provide a positive duration!"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_prefixes() {
        assert_eq!(Criterion::parse("r").unwrap(), Criterion::Rss);
        assert_eq!(Criterion::parse("ai").unwrap(), Criterion::Aic);
        assert_eq!(Criterion::parse("bic").unwrap(), Criterion::Bic);
        assert!(Criterion::parse("").is_err());
        assert!(Criterion::parse("bics").is_err());
        assert!(Criterion::parse("x").is_err());
    }

    #[test]
    fn multipliers_are_nonpositive() {
        for area in [2.0, 8.0, 1e6] {
            assert_eq!(Criterion::Rss.rss_multiplier(area), 0.0);
            assert!(Criterion::Aic.rss_multiplier(area) < 0.0);
            assert!(Criterion::Bic.rss_multiplier(area) < 0.0);
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config { jobs: 0, ..Config::default() };
        assert!(config.validate().is_err());
        config.jobs = 1;
        config.shift = ShiftMode::Constant(1.0);
        assert!(config.validate().is_err());
        config.shift = ShiftMode::Constant(0.5);
        config.density_threshold = 1.5;
        assert!(config.validate().is_err());
        config.density_threshold = 0.0;
        assert!(config.validate().is_ok());
        config.no_selection = true;
        config.output.print_rss = true;
        assert!(config.validate().is_err());
    }
}
