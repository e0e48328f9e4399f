//! Member repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist members together with their team reference.
//! - Answer the inverse side of the team relationship by query.
//!
//! # Invariants
//! - A member row never references a missing team (foreign key enforced).

use super::{fetch_compiled, write_error, RepoError, RepoResult};
use crate::model::member::{Member, MemberId};
use crate::model::team::TeamId;
use crate::model::{Entity, ValidationError};
use crate::query::CompiledQuery;
use rusqlite::{params, Connection, Row};

const MEMBER_SELECT_SQL: &str = "SELECT id, name, team_id FROM members";

/// Repository interface for member persistence.
pub trait MemberRepository {
    fn create_member(&self, member: &Member) -> RepoResult<MemberId>;
    fn update_member(&self, member: &Member) -> RepoResult<()>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    fn delete_member(&self, id: MemberId) -> RepoResult<()>;
    /// Lists members whose `team_id` equals `team_id`, ordered by id.
    fn list_members_of_team(&self, team_id: TeamId) -> RepoResult<Vec<Member>>;
    fn query_members(&self, query: &CompiledQuery) -> RepoResult<Vec<Member>>;
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn create_member(&self, member: &Member) -> RepoResult<MemberId> {
        member.validate()?;
        if let Some(id) = member.id {
            return Err(ValidationError::AlreadyPersisted {
                entity: Member::NAME,
                id: id.get(),
            }
            .into());
        }

        self.conn
            .execute(
                "INSERT INTO members (name, team_id) VALUES (?1, ?2);",
                params![member.name.as_str(), member.team_id.map(TeamId::get)],
            )
            .map_err(|err| write_error(Member::NAME, err))?;

        Ok(MemberId::from(self.conn.last_insert_rowid()))
    }

    fn update_member(&self, member: &Member) -> RepoResult<()> {
        member.validate()?;
        let id = member.id.ok_or(ValidationError::NotPersisted {
            entity: Member::NAME,
        })?;

        let changed = self
            .conn
            .execute(
                "UPDATE members SET name = ?1, team_id = ?2 WHERE id = ?3;",
                params![
                    member.name.as_str(),
                    member.team_id.map(TeamId::get),
                    id.get()
                ],
            )
            .map_err(|err| write_error(Member::NAME, err))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Member::NAME,
                id: id.get(),
            });
        }
        Ok(())
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.get()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_member_row(row)?));
        }
        Ok(None)
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE id = ?1;", [id.get()])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Member::NAME,
                id: id.get(),
            });
        }
        Ok(())
    }

    fn list_members_of_team(&self, team_id: TeamId) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL} WHERE team_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([team_id.get()])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn query_members(&self, query: &CompiledQuery) -> RepoResult<Vec<Member>> {
        fetch_compiled(self.conn, query, parse_member_row)
    }
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let member = Member {
        id: Some(MemberId::from(row.get::<_, i64>("id")?)),
        name: row.get("name")?,
        team_id: row.get::<_, Option<i64>>("team_id")?.map(TeamId::from),
    };
    member.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "members row {}: {err}",
            member.id.map_or(0, MemberId::get)
        ))
    })?;
    Ok(member)
}
