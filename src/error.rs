//! Error types for nclusterbox.
//!
//! Only the I/O boundary (option validation, readers, writers) produces
//! errors. The tensor, the pool, the visited set, the modifier and the
//! selection assume validated input and check their invariants with
//! `debug_assert!`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid option value or combination, or an input with nothing to mine
    #[error("{0}")]
    Usage(String),

    /// Input file missing or unreadable
    #[error("{}: {source}", path.display())]
    NoInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed line in a tensor or pattern file
    #[error("{file}:{line}: {message}")]
    DataFormat {
        file: String,
        line: usize,
        message: String,
    },

    /// Output file cannot be created
    #[error("{}: {source}", path.display())]
    NoOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure while writing results
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    pub fn data_format(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Error::DataFormat {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Process exit status, following sysexits(3)
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 64,
            Error::DataFormat { .. } => 65,
            Error::NoInput { .. } => 66,
            Error::NoOutput { .. } => 73,
            Error::Io(_) => 74,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_format_names_file_and_line() {
        let err = Error::data_format("tensor.txt", 12, "no element in dimension 1!");
        assert_eq!(err.to_string(), "tensor.txt:12: no element in dimension 1!");
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            Error::usage("x").exit_code(),
            Error::data_format("f", 1, "x").exit_code(),
            Error::NoInput {
                path: "a".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }
            .exit_code(),
            Error::NoOutput {
                path: "b".into(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            }
            .exit_code(),
        ];
        assert_eq!(codes, [64, 65, 66, 73]);
    }
}
