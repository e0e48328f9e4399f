//! Shared bootstrap for the roster binaries.
//!
//! # Responsibility
//! - Resolve the persistence unit (`ROSTER_CONFIG`, `ROSTER_UNIT`).
//! - Initialize logging before the first database call.
//! - Map script outcomes to process exit codes.

use log::{error, info};
use roster_core::script::error_chain;
use roster_core::{
    core_version, default_log_level, init_logging, load_unit_from_env, PersistenceContext,
};
use std::process::ExitCode;

/// Loads configuration, starts logging and opens the persistence context.
///
/// Failures are reported before returning `Err(ExitCode::FAILURE)`.
pub fn bootstrap() -> Result<PersistenceContext, ExitCode> {
    let unit = match load_unit_from_env() {
        Ok(unit) => unit,
        Err(err) => {
            // Logging is configured by the unit, so nothing is listening yet.
            eprintln!("roster: {}", error_chain(&err));
            return Err(ExitCode::FAILURE);
        }
    };

    let level = unit.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(message) = init_logging(level, unit.log_dir.as_deref()) {
        eprintln!("roster: {message}");
        return Err(ExitCode::FAILURE);
    }
    info!("{}", start_line(&unit.name));

    PersistenceContext::open(&unit).map_err(|err| {
        error!(
            "event=context_open module=cli status=error unit={} error={}",
            unit.name,
            error_chain(&err)
        );
        ExitCode::FAILURE
    })
}

fn start_line(unit: &str) -> String {
    format!(
        "event=cli_start module=cli status=ok version={} unit={unit}",
        core_version()
    )
}

/// Scripts log their own failures; only the exit status is left to decide.
pub fn exit_code<T, E>(result: Result<T, E>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
