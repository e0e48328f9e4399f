//! Demonstration scripts run by the CLI binaries.
//!
//! # Responsibility
//! - Run one transaction of persistence calls against a context.
//! - Roll back and log on failure; always close the context.
//!
//! # Invariants
//! - Scripts take ownership of the context, so it is released on every
//!   exit path.
//! - A failed script leaves nothing from its transaction in storage.

use crate::context::{ContextError, PersistenceContext};
use crate::logging::sanitize_message;
use crate::model::member::Member;
use crate::model::team::Team;
use crate::model::Entity;
use crate::query::criteria::escape_like;
use crate::query::{Criteria, Predicate};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::time::Instant;

const MAX_ERROR_CHAIN_CHARS: usize = 512;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug)]
pub enum ScriptError {
    Context(ContextError),
    /// Writing script output failed.
    Io(std::io::Error),
    /// An entity persisted earlier in the same transaction could not be read back.
    Missing { entity: &'static str, id: i64 },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "failed to write output: {err}"),
            Self::Missing { entity, id } => {
                write!(f, "{entity} {id} vanished before it could be re-read")
            }
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Context(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Missing { .. } => None,
        }
    }
}

impl From<ContextError> for ScriptError {
    fn from(value: ContextError) -> Self {
        Self::Context(value)
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Inputs of the team demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDemo {
    pub team_name: String,
    pub member_name: String,
}

impl Default for TeamDemo {
    fn default() -> Self {
        Self {
            team_name: "TeamA".to_string(),
            member_name: "member1".to_string(),
        }
    }
}

/// What the team demo read back before committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDemoReport {
    pub team: Team,
    pub member: Member,
    /// Names of the team's members, as enumerated from storage.
    pub roster: Vec<String>,
}

/// Persists a team and one member, re-reads both and commits.
///
/// Writes one `member=<name>` line per member of the re-read team to `out`.
pub fn run_team_demo(
    ctx: PersistenceContext,
    demo: &TeamDemo,
    out: &mut dyn Write,
) -> ScriptResult<TeamDemoReport> {
    run_in_transaction(ctx, "team_demo", |ctx| team_demo_steps(ctx, demo, out))
}

fn team_demo_steps(
    ctx: &PersistenceContext,
    demo: &TeamDemo,
    out: &mut dyn Write,
) -> ScriptResult<TeamDemoReport> {
    let mut team = Team::new(demo.team_name.as_str());
    let team_id = ctx.persist(&mut team)?;

    let mut member = Member::with_team(demo.member_name.as_str(), &team);
    let member_id = ctx.persist(&mut member)?;

    let team = ctx
        .find::<Team>(team_id)?
        .ok_or(ScriptError::Missing {
            entity: Team::NAME,
            id: team_id.get(),
        })?;
    let members = ctx.members_of(team_id)?;
    for member in &members {
        writeln!(out, "member={}", member.name)?;
    }

    let member = ctx
        .find::<Member>(member_id)?
        .ok_or(ScriptError::Missing {
            entity: Member::NAME,
            id: member_id.get(),
        })?;

    Ok(TeamDemoReport {
        team,
        member,
        roster: members.into_iter().map(|member| member.name).collect(),
    })
}

/// How the member query is expressed. Both forms return the same rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    Text,
    Criteria,
}

/// Name condition of the member query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Exact(String),
    Contains(String),
}

impl NameMatch {
    pub fn to_criteria(&self) -> Criteria<Member> {
        let predicate = match self {
            Self::Exact(name) => Predicate::eq("name", name.as_str()),
            Self::Contains(needle) => Predicate::contains("name", needle),
        };
        Criteria::new().filter(predicate)
    }

    pub fn to_query_text(&self) -> String {
        match self {
            Self::Exact(name) => format!(
                "select m from Member m where m.name = '{}'",
                quote_literal(name)
            ),
            Self::Contains(needle) => format!(
                "select m from Member m where m.name like '%{}%'",
                quote_literal(&escape_like(needle))
            ),
        }
    }
}

/// Queries members by name in the requested form and commits.
///
/// Writes one `member=<name>` line per match to `out`.
pub fn run_member_query(
    ctx: PersistenceContext,
    form: QueryForm,
    matcher: &NameMatch,
    out: &mut dyn Write,
) -> ScriptResult<Vec<Member>> {
    run_in_transaction(ctx, "member_query", |ctx| {
        let members = match form {
            QueryForm::Text => ctx.query_text::<Member>(&matcher.to_query_text())?,
            QueryForm::Criteria => ctx.query(&matcher.to_criteria())?,
        };
        for member in &members {
            writeln!(out, "member={}", member.name)?;
        }
        Ok(members)
    })
}

fn run_in_transaction<T>(
    mut ctx: PersistenceContext,
    script: &'static str,
    steps: impl FnOnce(&PersistenceContext) -> ScriptResult<T>,
) -> ScriptResult<T> {
    let started_at = Instant::now();
    info!(
        "event=script_run module=script status=start script={script} unit={}",
        ctx.unit_name()
    );

    let outcome = match ctx.begin_transaction() {
        Ok(()) => match steps(&ctx) {
            Ok(value) => ctx.commit().map(|()| value).map_err(ScriptError::from),
            Err(err) => {
                if let Err(rollback_err) = ctx.rollback() {
                    error!(
                        "event=script_rollback module=script status=error script={script} error={}",
                        error_chain(&rollback_err)
                    );
                }
                Err(err)
            }
        },
        Err(err) => Err(err.into()),
    };

    if let Err(err) = &outcome {
        error!(
            "event=script_run module=script status=error script={script} duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            error_chain(err)
        );
    }

    let closed = ctx.close();
    match (outcome, closed) {
        (Ok(value), Ok(())) => {
            info!(
                "event=script_run module=script status=ok script={script} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        (Ok(_), Err(close_err)) => {
            error!(
                "event=context_close module=script status=error script={script} error={}",
                error_chain(&close_err)
            );
            Err(close_err.into())
        }
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            error!(
                "event=context_close module=script status=error script={script} error={}",
                error_chain(&close_err)
            );
            Err(err)
        }
    }
}

/// Renders `err` and its sources as one `a: b: c` line.
pub fn error_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !chain.ends_with(&text) {
            chain.push_str(": ");
            chain.push_str(&text);
        }
        source = inner.source();
    }
    sanitize_message(&chain, MAX_ERROR_CHAIN_CHARS)
}

fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::{error_chain, NameMatch};
    use crate::context::ContextError;
    use crate::model::member::Member;
    use crate::query::{parse_query, Criteria, Predicate};
    use crate::repo::RepoError;

    #[test]
    fn both_query_forms_compile_to_the_same_criteria() {
        for matcher in [
            NameMatch::Exact("kim".to_string()),
            NameMatch::Exact("O'Neil".to_string()),
            NameMatch::Contains("50%".to_string()),
        ] {
            let parsed = parse_query::<Member>(&matcher.to_query_text()).unwrap();
            assert_eq!(parsed, matcher.to_criteria(), "{matcher:?}");
        }
    }

    #[test]
    fn contains_builds_escaped_like_pattern() {
        assert_eq!(
            NameMatch::Contains("kim".to_string()).to_criteria(),
            Criteria::<Member>::new().filter(Predicate::like("name", "%kim%"))
        );
    }

    #[test]
    fn error_chain_skips_repeated_messages() {
        let err = ContextError::Repo(RepoError::NotFound {
            entity: "Team",
            id: 4,
        });
        assert_eq!(error_chain(&err), "Team not found: 4");
    }
}
