//! Error types for parsing, structural edits, and collaborator lookups.

use thiserror::Error;

/// What went wrong while parsing a rule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedChar(char),
    InvalidNumber,
    ZeroSurface,
    UnbalancedOpen,
    UnbalancedClose,
    EmptyGroup,
    DanglingOperator,
    DanglingModifier,
    Empty,
    /// The final combine left this many placeholders instead of one.
    PlaceholderCount(usize),
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            ParseErrorKind::InvalidNumber => write!(f, "invalid surface number"),
            ParseErrorKind::ZeroSurface => write!(f, "surface id 0 is not allowed"),
            ParseErrorKind::UnbalancedOpen => write!(f, "unclosed '('"),
            ParseErrorKind::UnbalancedClose => write!(f, "unmatched ')'"),
            ParseErrorKind::EmptyGroup => write!(f, "empty group"),
            ParseErrorKind::DanglingOperator => write!(f, "dangling ':'"),
            ParseErrorKind::DanglingModifier => write!(f, "'#' or '%' without operand"),
            ParseErrorKind::Empty => write!(f, "empty expression"),
            ParseErrorKind::PlaceholderCount(n) => write!(f, "expression reduced to {} terms", n),
        }
    }
}

/// A malformed rule expression, with the offending text and its byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}: '{fragment}'")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub fragment: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, offset: usize, fragment: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            fragment: fragment.into(),
        }
    }
}

/// A structural invariant was violated by a tree operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("operation on an empty tree")]
    EmptyTree,
    #[error("leaf {0} not found")]
    LeafNotFound(String),
    #[error("expected a leaf node")]
    NotALeaf,
    #[error("parent links are stale, call make_parents first")]
    StaleParents,
    #[error("no node at address {0}")]
    BadAddress(usize),
    #[error("{count} atoms exceed the exhaustive-check limit of {limit}")]
    TooManyAtoms { count: usize, limit: usize },
}

/// A surface or region id could not be resolved by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown surface {0}")]
    Surface(u32),
    #[error("unknown region {0}")]
    Region(u32),
    #[error("region {region} nested deeper than {depth} levels")]
    RegionNesting { region: u32, depth: usize },
    #[error("negation failed: {0}")]
    Negation(String),
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// A rewrite loop exceeded its iteration cap. This is a defect signal.
    #[error("{pass} did not terminate within {limit} iterations")]
    NonTermination { pass: &'static str, limit: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
