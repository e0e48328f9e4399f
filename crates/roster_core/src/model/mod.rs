//! Entity model for teams and their members.
//!
//! # Responsibility
//! - Define the entity structs and their typed identities.
//! - Describe how entity fields map onto storage columns, so queries can be
//!   validated without touching the database.
//!
//! # Invariants
//! - An entity's id is `None` until it has been persisted once.
//! - Relationships are stored on the owning side only (`Member::team_id`);
//!   the inverse side is always derived by query.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod member;
pub mod team;

/// One queryable field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Path used by queries, e.g. `name` or `team.id`.
    pub path: &'static str,
    /// Storage column the path resolves to.
    pub column: &'static str,
}

/// Static mapping metadata shared by every persistent entity type.
pub trait Entity {
    /// Typed identity assigned on first persistence.
    type Id: Copy + Eq + Display + From<i64> + Into<i64>;

    /// Entity name as written in textual queries (`Team`, `Member`).
    const NAME: &'static str;
    /// Storage table.
    const TABLE: &'static str;
    /// Columns selected when loading an entity, in row order.
    const COLUMNS: &'static [&'static str];
    /// Queryable field paths. Several paths may share one column.
    const FIELDS: &'static [FieldMapping];

    fn id(&self) -> Option<Self::Id>;

    /// Records the identity generated by storage.
    fn assign_id(&mut self, id: Self::Id);

    /// Checks the entity before any write reaches storage.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Resolves a query field path to its storage column.
    fn column_for(path: &str) -> Option<&'static str> {
        Self::FIELDS
            .iter()
            .find(|field| field.path == path)
            .map(|field| field.column)
    }
}

/// Entity validation failure raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankName { entity: &'static str },
    AlreadyPersisted { entity: &'static str, id: i64 },
    NotPersisted { entity: &'static str },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName { entity } => write!(f, "{entity} name must not be blank"),
            Self::AlreadyPersisted { entity, id } => {
                write!(f, "{entity} {id} is already persisted; use merge to update it")
            }
            Self::NotPersisted { entity } => {
                write!(f, "{entity} has no id; persist it before updating")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_name(entity: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::BlankName { entity });
    }
    Ok(())
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use entity_id;
