//! Entity queries: programmatic criteria and a small textual query language.
//!
//! # Responsibility
//! - Express filtered reads over one entity type.
//! - Compile both query forms into the same parameterized SQL.
//!
//! # Invariants
//! - Field paths are checked against `Entity::FIELDS` before compiling.
//! - Values are bound as parameters, never spliced into SQL text.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod criteria;
pub mod text;

pub use criteria::{CompiledQuery, Criteria, Predicate, QueryValue, SortOrder};
pub use text::parse_query;

pub type QueryResult<T> = Result<T, QueryError>;

/// Query construction or parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed query text; `position` is a byte offset into the input.
    Syntax { position: usize, message: String },
    /// The query names an entity other than the one requested.
    UnknownEntity { expected: &'static str, found: String },
    UnknownField { entity: &'static str, field: String },
    UnknownAlias { expected: String, found: String },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { position, message } => {
                write!(f, "query syntax error at {position}: {message}")
            }
            Self::UnknownEntity { expected, found } => {
                write!(f, "query selects `{found}` but `{expected}` was requested")
            }
            Self::UnknownField { entity, field } => {
                write!(f, "`{field}` is not a mapped field of {entity}")
            }
            Self::UnknownAlias { expected, found } => {
                write!(f, "unknown alias `{found}`; the query declares `{expected}`")
            }
        }
    }
}

impl Error for QueryError {}
