//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts.
//! - Keep SQL and row decoding out of the persistence context.
//!
//! # Invariants
//! - Writes call `Entity::validate()` before any SQL mutation.
//! - Constraint failures surface as `RepoError::Constraint`, not as raw
//!   transport errors.

use crate::db::DbError;
use crate::model::ValidationError;
use crate::query::CompiledQuery;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod member_repo;
pub mod team_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// A storage constraint rejected the write (e.g. dangling team reference).
    Constraint {
        entity: &'static str,
        message: String,
    },
    NotFound {
        entity: &'static str,
        id: i64,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint { entity, message } => {
                write!(f, "{entity} violates a storage constraint: {message}")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Constraint { .. } | Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps SQLite constraint failures on writes to `RepoError::Constraint`.
pub(crate) fn write_error(entity: &'static str, err: rusqlite::Error) -> RepoError {
    let err = DbError::Sqlite(err);
    if err.is_constraint_violation() {
        return RepoError::Constraint {
            entity,
            message: err.to_string(),
        };
    }
    RepoError::Db(err)
}

/// Runs a compiled query and decodes every row with `parse`.
pub(crate) fn fetch_compiled<T>(
    conn: &Connection,
    query: &CompiledQuery,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}
