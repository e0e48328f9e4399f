//! Team entity.
//!
//! A team does not hold its members in memory. Use
//! `PersistenceContext::members_of` to enumerate them from storage.

use super::{entity_id, validate_name, Entity, FieldMapping, ValidationError};
use serde::{Deserialize, Serialize};

entity_id!(
    /// Storage-generated identity of a [`Team`].
    TeamId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<TeamId>,
    pub name: String,
}

impl Team {
    /// Creates a transient team; the id is assigned on persist.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Entity for Team {
    type Id = TeamId;

    const NAME: &'static str = "Team";
    const TABLE: &'static str = "teams";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const FIELDS: &'static [FieldMapping] = &[
        FieldMapping {
            path: "id",
            column: "id",
        },
        FieldMapping {
            path: "name",
            column: "name",
        },
    ];

    fn id(&self) -> Option<TeamId> {
        self.id
    }

    fn assign_id(&mut self, id: TeamId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(Self::NAME, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Team, TeamId};
    use crate::model::{Entity, ValidationError};

    #[test]
    fn new_team_is_transient() {
        let team = Team::new("TeamA");
        assert_eq!(team.id, None);
        assert!(team.validate().is_ok());
    }

    #[test]
    fn blank_name_fails_validation() {
        let err = Team::new("  ").validate().unwrap_err();
        assert_eq!(err, ValidationError::BlankName { entity: "Team" });
    }

    #[test]
    fn column_for_resolves_known_paths_only() {
        assert_eq!(Team::column_for("name"), Some("name"));
        assert_eq!(Team::column_for("members"), None);
    }

    #[test]
    fn team_id_displays_raw_value() {
        assert_eq!(TeamId::from(7).to_string(), "7");
    }
}
