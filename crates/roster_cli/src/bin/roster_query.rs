//! Member query entry point.
//!
//! Looks up members named `kim` through the criteria builder.

use roster_cli::{bootstrap, exit_code};
use roster_core::{run_member_query, NameMatch, QueryForm};
use std::process::ExitCode;

fn main() -> ExitCode {
    let ctx = match bootstrap() {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let mut stdout = std::io::stdout().lock();
    exit_code(run_member_query(
        ctx,
        QueryForm::Criteria,
        &NameMatch::Exact("kim".to_string()),
        &mut stdout,
    ))
}
