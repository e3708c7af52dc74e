//! Where the patterns go.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::config::OutputFormat;
use crate::context::TensorContext;
use crate::error::{Error, Result};
use crate::pattern::{self, ElementId};

/// Receives the output patterns, in internal ids.
pub trait PatternSink: Send {
    /// `density` is in shifted membership units; `rss`, in squared
    /// membership units, is the RSS of the selection truncated after
    /// this pattern.
    fn emit(&mut self, nset: &[Vec<ElementId>], density: f64, rss: Option<f64>) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered writer over a file, or stdout for `-`
pub fn open_output(path: &Path) -> Result<Box<dyn Write + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file = File::create(path).map_err(|source| Error::NoOutput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Writes one line per pattern, labels in the input's dimension order.
pub struct PatternWriter<'a, W> {
    out: W,
    context: &'a TensorContext,
    format: &'a OutputFormat,
}

impl<'a, W: Write + Send> PatternWriter<'a, W> {
    pub fn new(out: W, context: &'a TensorContext, format: &'a OutputFormat) -> Self {
        Self { out, context, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> PatternSink for PatternWriter<'_, W> {
    fn emit(&mut self, nset: &[Vec<ElementId>], density: f64, rss: Option<f64>) -> Result<()> {
        let format = self.format;
        for labels in self.context.external_labels(nset) {
            write!(
                self.out,
                "{}{}",
                labels.join(&format.element_separator),
                format.dimension_separator
            )?;
        }
        let density = if format.print_shifted {
            density
        } else {
            density + self.context.shift().average_shift(nset)
        };
        write!(self.out, "{density}")?;
        if format.print_sizes {
            let sizes: Vec<String> = self
                .context
                .external_to_internal()
                .iter()
                .map(|&axis| nset[axis].len().to_string())
                .collect();
            write!(self.out, "{}{}", format.size_prefix, sizes.join(&format.size_separator))?;
        }
        if format.print_area {
            write!(self.out, "{}{}", format.area_prefix, pattern::area(nset))?;
        }
        if let Some(rss) = rss.filter(|_| format.print_rss) {
            write!(self.out, "{}{rss}", format.rss_prefix)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
