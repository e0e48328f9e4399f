//! Programmatic criteria builder.
//!
//! ```
//! use roster_core::query::{Criteria, Predicate};
//! use roster_core::Member;
//!
//! let criteria = Criteria::<Member>::new().filter(Predicate::eq("name", "kim"));
//! let compiled = criteria.compile().unwrap();
//! assert!(compiled.sql.contains("WHERE name = ?"));
//! ```

use super::{QueryError, QueryResult};
use crate::model::Entity;
use rusqlite::types::Value;
use std::fmt::Write as _;
use std::marker::PhantomData;

/// Literal value compared against a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Integer(i64),
    Text(String),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<crate::model::team::TeamId> for QueryValue {
    fn from(value: crate::model::team::TeamId) -> Self {
        Self::Integer(value.get())
    }
}

impl From<crate::model::member::MemberId> for QueryValue {
    fn from(value: crate::model::member::MemberId) -> Self {
        Self::Integer(value.get())
    }
}

impl From<QueryValue> for Value {
    fn from(value: QueryValue) -> Self {
        match value {
            QueryValue::Integer(value) => Value::Integer(value),
            QueryValue::Text(value) => Value::Text(value),
        }
    }
}

/// Single filter condition. Conditions in one criteria are joined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq { field: String, value: QueryValue },
    NotEq { field: String, value: QueryValue },
    /// SQL `LIKE` with `%`/`_` wildcards and `\` as escape character.
    Like { field: String, pattern: String },
    IsNull { field: String },
    IsNotNull { field: String },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self::NotEq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Substring match; wildcard characters in `needle` match literally.
    pub fn contains(field: impl Into<String>, needle: &str) -> Self {
        Self::like(field, format!("%{}%", escape_like(needle)))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::IsNotNull {
            field: field.into(),
        }
    }

    fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::NotEq { field, .. }
            | Self::Like { field, .. }
            | Self::IsNull { field }
            | Self::IsNotNull { field } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Typed read query over entity `E`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria<E> {
    predicates: Vec<Predicate>,
    order_by: Option<(String, SortOrder)>,
    limit: Option<u32>,
    entity: PhantomData<fn() -> E>,
}

/// SQL text plus bound parameters, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl<E: Entity> Default for Criteria<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Criteria<E> {
    /// Selects every entity of type `E`.
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
            order_by: None,
            limit: None,
            entity: PhantomData,
        }
    }

    /// Adds a condition, AND-ed with existing ones.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Compiles into SQL against `E::TABLE`.
    ///
    /// Without an explicit ordering rows come back by ascending id.
    ///
    /// # Errors
    /// - `QueryError::UnknownField` when a predicate or ordering names a
    ///   path outside `E::FIELDS`.
    pub fn compile(&self) -> QueryResult<CompiledQuery> {
        let mut sql = format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE);
        let mut params = Vec::new();

        for (index, predicate) in self.predicates.iter().enumerate() {
            let column = resolve_column::<E>(predicate.field())?;
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            match predicate {
                Predicate::Eq { value, .. } => {
                    let _ = write!(sql, "{column} = ?");
                    params.push(Value::from(value.clone()));
                }
                Predicate::NotEq { value, .. } => {
                    let _ = write!(sql, "{column} <> ?");
                    params.push(Value::from(value.clone()));
                }
                Predicate::Like { pattern, .. } => {
                    let _ = write!(sql, "{column} LIKE ? ESCAPE '\\'");
                    params.push(Value::Text(pattern.clone()));
                }
                Predicate::IsNull { .. } => {
                    let _ = write!(sql, "{column} IS NULL");
                }
                Predicate::IsNotNull { .. } => {
                    let _ = write!(sql, "{column} IS NOT NULL");
                }
            }
        }

        match &self.order_by {
            Some((field, order)) => {
                let column = resolve_column::<E>(field)?;
                let _ = write!(sql, " ORDER BY {column} {}", order.sql());
                if column != "id" {
                    sql.push_str(", id ASC");
                }
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::from(limit)));
        }

        Ok(CompiledQuery { sql, params })
    }
}

fn resolve_column<E: Entity>(path: &str) -> QueryResult<&'static str> {
    E::column_for(path).ok_or_else(|| QueryError::UnknownField {
        entity: E::NAME,
        field: path.to_string(),
    })
}

/// Escapes `LIKE` wildcards so `value` matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
