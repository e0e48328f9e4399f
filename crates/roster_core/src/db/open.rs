//! Connection bootstrap for persistence units.
//!
//! # Responsibility
//! - Open file-backed or in-memory SQLite connections.
//! - Configure connection pragmas the entity mapping relies on.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Where a persistence unit keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Private in-memory database, discarded when the connection closes.
    Memory,
    /// SQLite database file, created on first open.
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parses the configuration form: `:memory:` or a file path.
    ///
    /// Blank values are rejected: SQLite would open them as an anonymous
    /// temporary database and silently discard every commit.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim() {
            "" => Err("database cannot be empty".to_string()),
            ":memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

/// Opens the database at `location` and applies all pending migrations.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(location: &DatabaseLocation) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = location.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match location {
        DatabaseLocation::Memory => Connection::open_in_memory(),
        DatabaseLocation::File(path) => Connection::open(path),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = bootstrap_connection(&mut conn) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

/// Shorthand for `open_db(&DatabaseLocation::Memory)`.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db(&DatabaseLocation::Memory)
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::DatabaseLocation;
    use std::path::PathBuf;

    #[test]
    fn parse_recognizes_memory_marker() {
        assert_eq!(
            DatabaseLocation::parse(" :memory: "),
            Ok(DatabaseLocation::Memory)
        );
        assert_eq!(
            DatabaseLocation::parse("data/roster.db"),
            Ok(DatabaseLocation::File(PathBuf::from("data/roster.db")))
        );
    }

    #[test]
    fn parse_rejects_blank_values() {
        for value in ["", "   "] {
            let err = DatabaseLocation::parse(value).unwrap_err();
            assert!(err.contains("empty"), "{value:?}: {err}");
        }
    }
}
