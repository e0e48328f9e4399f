//! Team/member persistence over SQLite.
//!
//! A persistence context demarcates transactions and stores [`Team`] and
//! [`Member`] entities; reads go through typed criteria or a small textual
//! query language.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod script;

pub use config::{load_unit, load_unit_from_env, ConfigError, PersistenceUnit, DEFAULT_UNIT};
pub use context::{ContextError, ContextResult, Managed, PersistenceContext};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::member::{Member, MemberId};
pub use model::team::{Team, TeamId};
pub use model::{Entity, ValidationError};
pub use query::{parse_query, Criteria, Predicate, QueryError, SortOrder};
pub use repo::member_repo::{MemberRepository, SqliteMemberRepository};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use repo::{RepoError, RepoResult};
pub use script::{
    run_member_query, run_team_demo, NameMatch, QueryForm, ScriptError, TeamDemo, TeamDemoReport,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
