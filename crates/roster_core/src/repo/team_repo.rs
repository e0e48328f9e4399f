//! Team repository contract and SQLite implementation.
//!
//! # Invariants
//! - Deleting a team never deletes members; storage clears their `team_id`.

use super::{fetch_compiled, write_error, RepoError, RepoResult};
use crate::model::team::{Team, TeamId};
use crate::model::{Entity, ValidationError};
use crate::query::CompiledQuery;
use rusqlite::{params, Connection, Row};

const TEAM_SELECT_SQL: &str = "SELECT id, name FROM teams";

/// Repository interface for team persistence.
pub trait TeamRepository {
    fn create_team(&self, team: &Team) -> RepoResult<TeamId>;
    fn update_team(&self, team: &Team) -> RepoResult<()>;
    fn get_team(&self, id: TeamId) -> RepoResult<Option<Team>>;
    fn delete_team(&self, id: TeamId) -> RepoResult<()>;
    fn query_teams(&self, query: &CompiledQuery) -> RepoResult<Vec<Team>>;
}

/// SQLite-backed team repository.
pub struct SqliteTeamRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeamRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn create_team(&self, team: &Team) -> RepoResult<TeamId> {
        team.validate()?;
        if let Some(id) = team.id {
            return Err(ValidationError::AlreadyPersisted {
                entity: Team::NAME,
                id: id.get(),
            }
            .into());
        }

        self.conn
            .execute("INSERT INTO teams (name) VALUES (?1);", [team.name.as_str()])
            .map_err(|err| write_error(Team::NAME, err))?;

        Ok(TeamId::from(self.conn.last_insert_rowid()))
    }

    fn update_team(&self, team: &Team) -> RepoResult<()> {
        team.validate()?;
        let id = team.id.ok_or(ValidationError::NotPersisted { entity: Team::NAME })?;

        let changed = self
            .conn
            .execute(
                "UPDATE teams SET name = ?1 WHERE id = ?2;",
                params![team.name.as_str(), id.get()],
            )
            .map_err(|err| write_error(Team::NAME, err))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Team::NAME,
                id: id.get(),
            });
        }
        Ok(())
    }

    fn get_team(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEAM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.get()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_team_row(row)?));
        }
        Ok(None)
    }

    fn delete_team(&self, id: TeamId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM teams WHERE id = ?1;", [id.get()])
            .map_err(|err| write_error(Team::NAME, err))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Team::NAME,
                id: id.get(),
            });
        }
        Ok(())
    }

    fn query_teams(&self, query: &CompiledQuery) -> RepoResult<Vec<Team>> {
        fetch_compiled(self.conn, query, parse_team_row)
    }
}

fn parse_team_row(row: &Row<'_>) -> RepoResult<Team> {
    let team = Team {
        id: Some(TeamId::from(row.get::<_, i64>("id")?)),
        name: row.get("name")?,
    };
    team.validate().map_err(|err| {
        RepoError::InvalidData(format!("teams row {}: {err}", team.id.map_or(0, TeamId::get)))
    })?;
    Ok(team)
}
