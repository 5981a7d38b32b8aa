use std::path::PathBuf;

use thiserror::Error;

pub type Span = logos::Span;

/// Schematic parse errors
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("SExpr {0} not found")]
    MissingChild(String),
    #[error("Value not found")]
    MissingValue(),
    #[error("Invalid number {0}")]
    InvalidNumber(String),
    #[error("Unknown mirror {0}")]
    UnknownMirror(String),
    #[error("Invalid unit name {0}")]
    InvalidUnitName(String),
    #[error("Unexpected end of input at line {line} ({at:?})")]
    UnexpectedEof { line: usize, at: Span },
    #[error("Expected {expected} but found {found} at line {line} ({at:?})")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        at: Span,
    },
    #[error("Unknown token {found} at line {line} ({at:?})")]
    UnknownToken {
        found: String,
        line: usize,
        at: Span,
    },
    #[error("Unterminated string at line {line} ({at:?})")]
    UnterminatedString { line: usize, at: Span },
}

/// Errors raised while loading a schematic and building its netlist
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Library name {0} is not of the form Library:Symbol")]
    LibraryFormat(String),
    #[error("Library symbol {0} not found")]
    LibraryNotFound(String),
    #[error("Library symbol {0} extends itself")]
    RecursiveExtends(String),
    #[error("Pin {pin} of {reference} has no net")]
    UnresolvedNet { reference: String, pin: String },
    #[error("Unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// 1-based line number of a byte offset
pub(crate) fn line_of(input: &str, offset: usize) -> usize {
    let end = offset.min(input.len());
    input.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
