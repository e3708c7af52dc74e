//! Text readers for the tensor and for initial patterns.
//!
//! One line lists one field per dimension, then, for the tensor and
//! unless it is Boolean, a membership degree in [0, 1]. Fields are
//! separated by any character of a dimension separator set; a field
//! lists elements separated by any character of an element separator
//! set, and stands for every tuple of the Cartesian product.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::context::TensorContext;
use crate::error::{Error, Result};
use crate::pattern::{ElementId, NSet, Tuples};
use crate::tensor::{FuzzyTuple, RawTensor};

/// Buffered reader over a file, or stdin for `-`
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).map_err(|source| Error::NoInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

fn display_name(path: &Path) -> String {
    if path == Path::new("-") {
        "standard input".to_string()
    } else {
        path.display().to_string()
    }
}

fn tokens<'l>(line: &'l str, separators: &'l str) -> impl Iterator<Item = &'l str> + 'l {
    line.split(move |c| separators.contains(c))
        .filter(|token| !token.is_empty())
}

#[derive(Clone, Debug)]
pub struct TupleReader {
    dimension_separators: String,
    element_separators: String,
    /// No membership column; every listed tuple has membership 1
    boolean: bool,
}

impl TupleReader {
    pub fn new(dimension_separators: &str, element_separators: &str, boolean: bool) -> Self {
        Self {
            dimension_separators: dimension_separators.to_string(),
            element_separators: element_separators.to_string(),
            boolean,
        }
    }

    pub fn read_path(&self, path: &Path) -> Result<RawTensor> {
        let input = open_input(path)?;
        self.read(input, &display_name(path))
    }

    /// Reads every line of `input`; `name` identifies it in errors.
    pub fn read<R: BufRead>(&self, input: R, name: &str) -> Result<RawTensor> {
        let mut labels: Vec<IndexSet<String>> = Vec::new();
        let mut tuples = Vec::new();
        let mut lines_with_tuples = 0usize;
        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let mut fields: Vec<&str> = tokens(line.trim_end_matches('\r'), &self.dimension_separators).collect();
            if fields.is_empty() {
                continue;
            }
            let membership = if self.boolean {
                1.0
            } else {
                let token = fields.pop().unwrap_or_default();
                parse_membership(token).ok_or_else(|| {
                    Error::data_format(
                        name,
                        line_number,
                        format!("the membership, {token}, should be a double in [0, 1]!"),
                    )
                })?
            };
            if labels.is_empty() {
                if fields.len() < 2 {
                    return Err(Error::usage(format!(
                        "{name}:{line_number}: {} dimension, but at least 2 are required!",
                        fields.len()
                    )));
                }
                labels.resize_with(fields.len(), IndexSet::new);
            }
            let n = labels.len();
            if fields.len() < n {
                return Err(Error::data_format(
                    name,
                    line_number,
                    format!("fewer than the expected {n} dimensions!"),
                ));
            }
            if fields.len() > n {
                return Err(Error::data_format(
                    name,
                    line_number,
                    format!("more than the expected {n} dimensions!"),
                ));
            }
            lines_with_tuples += 1;
            if membership == 0.0 {
                continue;
            }
            let mut nset: NSet = Vec::with_capacity(n);
            for (dimension, (field, dimension_labels)) in fields.iter().zip(labels.iter_mut()).enumerate() {
                let ids: Vec<ElementId> = tokens(field, &self.element_separators)
                    .map(|label| dimension_labels.insert_full(label.to_string()).0 as ElementId)
                    .collect();
                if ids.is_empty() {
                    return Err(Error::data_format(
                        name,
                        line_number,
                        format!("no element in dimension {dimension}!"),
                    ));
                }
                nset.push(ids);
            }
            tuples.extend(Tuples::new(&nset).map(|tuple| FuzzyTuple { tuple, membership }));
        }
        if lines_with_tuples == 0 {
            return Err(Error::usage(format!("No tuple in {name}!")));
        }
        if tuples.is_empty() {
            return Err(Error::usage(format!(
                "All tuples in {name} have null membership degrees!"
            )));
        }
        let raw = RawTensor::new(labels, tuples);
        info!(
            file = name,
            dimensions = raw.labels.len(),
            tuples = raw.tuples.len(),
            crisp = raw.is_crisp,
            "tensor read"
        );
        Ok(raw)
    }
}

fn parse_membership(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|membership| (0.0..=1.0).contains(membership))
}

/// Reads initial patterns, labels resolved through the tensor context.
/// Malformed lines are logged and skipped.
pub struct PatternReader<'a> {
    context: &'a TensorContext,
    dimension_separators: &'a str,
    element_separators: &'a str,
}

impl<'a> PatternReader<'a> {
    pub fn new(context: &'a TensorContext, dimension_separators: &'a str, element_separators: &'a str) -> Self {
        Self {
            context,
            dimension_separators,
            element_separators,
        }
    }

    pub fn read_path(&self, path: &Path, max: Option<usize>, sink: impl FnMut(NSet)) -> Result<usize> {
        let input = open_input(path)?;
        self.read(input, &display_name(path), max, sink)
    }

    /// Passes up to `max` valid patterns, in internal ids, to `sink`, and
    /// returns how many.
    pub fn read<R: BufRead>(
        &self,
        input: R,
        name: &str,
        max: Option<usize>,
        mut sink: impl FnMut(NSet),
    ) -> Result<usize> {
        let mut count = 0;
        for (index, line) in input.lines().enumerate() {
            if max.is_some_and(|max| count >= max) {
                break;
            }
            let line = line?;
            let line = line.trim_end_matches('\r');
            if tokens(line, self.dimension_separators).next().is_none() {
                continue;
            }
            match self.parse(line) {
                Ok(nset) => {
                    sink(nset);
                    count += 1;
                }
                Err(message) => {
                    let error = Error::data_format(name, index + 1, message);
                    warn!("{error} -> pattern ignored");
                }
            }
        }
        Ok(count)
    }

    fn parse(&self, line: &str) -> std::result::Result<NSet, String> {
        let n = self.context.arity();
        let fields: Vec<&str> = tokens(line, self.dimension_separators).collect();
        if fields.len() < n {
            return Err(format!("fewer than the expected {n} dimensions!"));
        }
        if fields.len() > n {
            return Err(format!("more than the expected {n} dimensions!"));
        }
        let mut nset = vec![Vec::new(); n];
        for (dimension, (field, &axis)) in fields.iter().zip(self.context.external_to_internal()).enumerate() {
            let mut ids = tokens(field, self.element_separators)
                .map(|label| {
                    self.context
                        .label_id(axis, label)
                        .ok_or_else(|| format!("{label} is not an element of dimension {dimension}!"))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if ids.is_empty() {
                return Err(format!("no element in dimension {dimension}!"));
            }
            ids.sort_unstable();
            if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
                let label = self.context.label(axis, pair[0]).unwrap_or_default();
                return Err(format!("{label} is repeated in dimension {dimension}!"));
            }
            nset[axis] = ids;
        }
        Ok(nset)
    }
}
