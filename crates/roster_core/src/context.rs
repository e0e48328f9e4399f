//! Persistence context: unit of work over one SQLite connection.
//!
//! # Responsibility
//! - Demarcate transactions (`begin_transaction`/`commit`/`rollback`).
//! - Persist, merge, remove, find and query entities inside a transaction.
//! - Release the connection on `close`, rolling back unfinished work.
//!
//! # Invariants
//! - Every entity operation requires an active transaction.
//! - At most one transaction is active per context.
//! - A context that is dropped or closed mid-transaction rolls back.

use crate::config::PersistenceUnit;
use crate::db::{open_db, DbError};
use crate::model::member::Member;
use crate::model::team::{Team, TeamId};
use crate::model::Entity;
use crate::query::{parse_query, CompiledQuery, Criteria, QueryError};
use crate::repo::member_repo::{MemberRepository, SqliteMemberRepository};
use crate::repo::team_repo::{SqliteTeamRepository, TeamRepository};
use crate::repo::{RepoError, RepoResult};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ContextResult<T> = Result<T, ContextError>;

#[derive(Debug)]
pub enum ContextError {
    /// Entity operation or commit/rollback attempted outside a transaction.
    TransactionRequired { operation: &'static str },
    /// `begin_transaction` called while a transaction is already active.
    TransactionActive,
    Repo(RepoError),
    Query(QueryError),
    Db(DbError),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransactionRequired { operation } => {
                write!(f, "`{operation}` requires an active transaction")
            }
            Self::TransactionActive => write!(f, "a transaction is already active"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::TransactionRequired { .. } | Self::TransactionActive => None,
        }
    }
}

impl From<RepoError> for ContextError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<QueryError> for ContextError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<DbError> for ContextError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ContextError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Entity types the context knows how to store.
///
/// Implemented for [`Team`] and [`Member`] by delegating to their
/// repositories.
pub trait Managed: Entity + Sized {
    fn insert(conn: &Connection, entity: &Self) -> RepoResult<Self::Id>;
    fn update(conn: &Connection, entity: &Self) -> RepoResult<()>;
    fn delete(conn: &Connection, id: Self::Id) -> RepoResult<()>;
    fn load(conn: &Connection, id: Self::Id) -> RepoResult<Option<Self>>;
    fn select(conn: &Connection, query: &CompiledQuery) -> RepoResult<Vec<Self>>;
}

impl Managed for Team {
    fn insert(conn: &Connection, entity: &Self) -> RepoResult<TeamId> {
        SqliteTeamRepository::new(conn).create_team(entity)
    }

    fn update(conn: &Connection, entity: &Self) -> RepoResult<()> {
        SqliteTeamRepository::new(conn).update_team(entity)
    }

    fn delete(conn: &Connection, id: TeamId) -> RepoResult<()> {
        SqliteTeamRepository::new(conn).delete_team(id)
    }

    fn load(conn: &Connection, id: TeamId) -> RepoResult<Option<Self>> {
        SqliteTeamRepository::new(conn).get_team(id)
    }

    fn select(conn: &Connection, query: &CompiledQuery) -> RepoResult<Vec<Self>> {
        SqliteTeamRepository::new(conn).query_teams(query)
    }
}

impl Managed for Member {
    fn insert(conn: &Connection, entity: &Self) -> RepoResult<Self::Id> {
        SqliteMemberRepository::new(conn).create_member(entity)
    }

    fn update(conn: &Connection, entity: &Self) -> RepoResult<()> {
        SqliteMemberRepository::new(conn).update_member(entity)
    }

    fn delete(conn: &Connection, id: Self::Id) -> RepoResult<()> {
        SqliteMemberRepository::new(conn).delete_member(id)
    }

    fn load(conn: &Connection, id: Self::Id) -> RepoResult<Option<Self>> {
        SqliteMemberRepository::new(conn).get_member(id)
    }

    fn select(conn: &Connection, query: &CompiledQuery) -> RepoResult<Vec<Self>> {
        SqliteMemberRepository::new(conn).query_members(query)
    }
}

/// Unit of work bound to one persistence unit.
///
/// The connection lives as long as the context; `close` and `Drop` both
/// release it.
pub struct PersistenceContext {
    unit: String,
    conn: Connection,
}

impl PersistenceContext {
    /// Opens the database configured by `unit` and applies migrations.
    pub fn open(unit: &PersistenceUnit) -> ContextResult<Self> {
        let conn = open_db(&unit.location)?;
        info!(
            "event=context_open module=context status=ok unit={}",
            unit.name
        );
        Ok(Self::from_connection(unit.name.clone(), conn))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(unit: impl Into<String>, conn: Connection) -> Self {
        Self {
            unit: unit.into(),
            conn,
        }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit
    }

    pub fn is_transaction_active(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub fn begin_transaction(&mut self) -> ContextResult<()> {
        if self.is_transaction_active() {
            return Err(ContextError::TransactionActive);
        }
        self.conn.execute_batch("BEGIN DEFERRED;")?;
        debug!(
            "event=tx_begin module=context status=ok unit={}",
            self.unit
        );
        Ok(())
    }

    /// Commits the active transaction.
    ///
    /// A failed commit leaves nothing pending: the transaction is rolled back
    /// before the error is returned.
    pub fn commit(&mut self) -> ContextResult<()> {
        let conn = self.active_connection("commit")?;
        if let Err(err) = conn.execute_batch("COMMIT;") {
            error!(
                "event=tx_commit module=context status=error unit={} error={}",
                self.unit, err
            );
            if !conn.is_autocommit() {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                    error!(
                        "event=tx_rollback module=context status=error unit={} error={}",
                        self.unit, rollback_err
                    );
                }
            }
            return Err(err.into());
        }
        info!(
            "event=tx_commit module=context status=ok unit={}",
            self.unit
        );
        Ok(())
    }

    pub fn rollback(&mut self) -> ContextResult<()> {
        self.active_connection("rollback")?
            .execute_batch("ROLLBACK;")?;
        info!(
            "event=tx_rollback module=context status=ok unit={}",
            self.unit
        );
        Ok(())
    }

    /// Makes a transient entity persistent and records its generated id.
    ///
    /// # Errors
    /// - `RepoError::Validation` when the entity is invalid or already has
    ///   an id.
    /// - `RepoError::Constraint` when storage rejects the row.
    pub fn persist<E: Managed>(&self, entity: &mut E) -> ContextResult<E::Id> {
        let conn = self.active_connection("persist")?;
        let id = E::insert(conn, entity)?;
        entity.assign_id(id);
        debug!(
            "event=entity_persist module=context status=ok entity={} id={}",
            E::NAME,
            id
        );
        Ok(id)
    }

    /// Writes the state of an already persisted entity.
    pub fn merge<E: Managed>(&self, entity: &E) -> ContextResult<()> {
        let conn = self.active_connection("merge")?;
        E::update(conn, entity)?;
        Ok(())
    }

    pub fn remove<E: Managed>(&self, id: E::Id) -> ContextResult<()> {
        let conn = self.active_connection("remove")?;
        E::delete(conn, id)?;
        debug!(
            "event=entity_remove module=context status=ok entity={} id={}",
            E::NAME,
            id
        );
        Ok(())
    }

    /// Loads one entity by id; `None` when no row exists.
    pub fn find<E: Managed>(&self, id: E::Id) -> ContextResult<Option<E>> {
        let conn = self.active_connection("find")?;
        Ok(E::load(conn, id)?)
    }

    /// Runs a criteria query.
    pub fn query<E: Managed>(&self, criteria: &Criteria<E>) -> ContextResult<Vec<E>> {
        let conn = self.active_connection("query")?;
        let compiled = criteria.compile()?;
        let items = E::select(conn, &compiled)?;
        debug!(
            "event=entity_query module=context status=ok entity={} predicates={} rows={}",
            E::NAME,
            criteria.predicates().len(),
            items.len()
        );
        Ok(items)
    }

    /// Parses `text` with the query language and runs it.
    pub fn query_text<E: Managed>(&self, text: &str) -> ContextResult<Vec<E>> {
        self.active_connection("query")?;
        let criteria = parse_query::<E>(text)?;
        self.query(&criteria)
    }

    /// Enumerates the members that reference `team_id`, ordered by id.
    pub fn members_of(&self, team_id: TeamId) -> ContextResult<Vec<Member>> {
        let conn = self.active_connection("members_of")?;
        let members = SqliteMemberRepository::new(conn).list_members_of_team(team_id)?;
        debug!(
            "event=team_members module=context status=ok team_id={} rows={}",
            team_id,
            members.len()
        );
        Ok(members)
    }

    /// Releases the connection, rolling back any active transaction first.
    pub fn close(self) -> ContextResult<()> {
        if self.is_transaction_active() {
            warn!(
                "event=context_close module=context status=rollback unit={}",
                self.unit
            );
            self.conn.execute_batch("ROLLBACK;")?;
        }
        info!(
            "event=context_close module=context status=ok unit={}",
            self.unit
        );
        Ok(())
    }

    fn active_connection(&self, operation: &'static str) -> ContextResult<&Connection> {
        if !self.is_transaction_active() {
            return Err(ContextError::TransactionRequired { operation });
        }
        Ok(&self.conn)
    }
}

impl Drop for PersistenceContext {
    fn drop(&mut self) {
        if !self.is_transaction_active() {
            return;
        }
        if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
            error!(
                "event=context_drop module=context status=error unit={} error={}",
                self.unit, err
            );
        }
    }
}
