//! nclusterbox: dense n-sets in fuzzy tensors
//!
//! Starting from initial patterns (one per positive tuple by default),
//! worker threads hill-climb to local maxima of `sum * |sum| / area` in a
//! tensor whose memberships are shifted by a null model. The local optima
//! then compete in a stepwise selection minimizing the residual sum of
//! squares, penalized by AIC or BIC.
//!
//! - [`tensor`]: fixed-point storage with fast sums on patterns
//! - [`pool`], [`visited`], [`modifier`]: the parallel hill climbing
//! - [`selection`]: the stepwise selection
//! - [`reader`], [`output`]: text formats
//! - [`engine`]: a whole run

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod modifier;
pub mod output;
pub mod pattern;
pub mod pool;
pub mod reader;
pub mod selection;
pub mod tensor;
pub mod visited;

pub use config::{Config, Criterion, DedupMode, ShiftMode};
pub use context::TensorContext;
pub use engine::{mine, run, Summary};
pub use error::{Error, Result};
pub use pattern::{ElementId, NSet};
pub use tensor::{preprocess, Preprocessed, Tensor};
