//! Member entity.
//!
//! # Invariants
//! - `team_id` is the single source of truth for team membership.
//! - A persisted `team_id` must reference an existing team.

use super::team::{Team, TeamId};
use super::{entity_id, validate_name, Entity, FieldMapping, ValidationError};
use serde::{Deserialize, Serialize};

entity_id!(
    /// Storage-generated identity of a [`Member`].
    MemberId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<MemberId>,
    pub name: String,
    /// Owning team, if any.
    pub team_id: Option<TeamId>,
}

impl Member {
    /// Creates a transient member without a team.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            team_id: None,
        }
    }

    /// Creates a transient member referencing `team`.
    ///
    /// `team` must already be persisted for the reference to carry an id.
    pub fn with_team(name: impl Into<String>, team: &Team) -> Self {
        let mut member = Self::new(name);
        member.assign_team(team);
        member
    }

    /// Points this member at `team`. Changes reach storage on persist/merge.
    pub fn assign_team(&mut self, team: &Team) {
        self.team_id = team.id;
    }

    /// Detaches this member from its team without touching the team.
    pub fn leave_team(&mut self) {
        self.team_id = None;
    }

    pub fn belongs_to(&self, team: &Team) -> bool {
        team.id.is_some() && self.team_id == team.id
    }
}

impl Entity for Member {
    type Id = MemberId;

    const NAME: &'static str = "Member";
    const TABLE: &'static str = "members";
    const COLUMNS: &'static [&'static str] = &["id", "name", "team_id"];
    const FIELDS: &'static [FieldMapping] = &[
        FieldMapping {
            path: "id",
            column: "id",
        },
        FieldMapping {
            path: "name",
            column: "name",
        },
        FieldMapping {
            path: "team.id",
            column: "team_id",
        },
        FieldMapping {
            path: "team_id",
            column: "team_id",
        },
    ];

    fn id(&self) -> Option<MemberId> {
        self.id
    }

    fn assign_id(&mut self, id: MemberId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(Self::NAME, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::Member;
    use crate::model::team::{Team, TeamId};
    use crate::model::Entity;

    #[test]
    fn with_team_copies_team_identity() {
        let mut team = Team::new("TeamA");
        team.assign_id(TeamId::from(3));

        let member = Member::with_team("member1", &team);
        assert_eq!(member.team_id, Some(TeamId::from(3)));
        assert!(member.belongs_to(&team));
    }

    #[test]
    fn leave_team_clears_reference() {
        let mut team = Team::new("TeamA");
        team.assign_id(TeamId::from(3));
        let mut member = Member::with_team("member1", &team);

        member.leave_team();
        assert_eq!(member.team_id, None);
        assert!(!member.belongs_to(&team));
    }

    #[test]
    fn transient_team_never_owns_members() {
        let team = Team::new("TeamA");
        let member = Member::with_team("member1", &team);
        assert!(!member.belongs_to(&team));
    }

    #[test]
    fn team_paths_share_one_column() {
        assert_eq!(Member::column_for("team.id"), Some("team_id"));
        assert_eq!(Member::column_for("team_id"), Some("team_id"));
    }

    #[test]
    fn serializes_ids_as_plain_numbers() {
        let mut member = Member::new("kim");
        member.assign_id(10.into());
        member.team_id = Some(TeamId::from(2));

        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["id"], 10);
        assert_eq!(json["team_id"], 2);
    }
}
