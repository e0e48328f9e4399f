//! Team/member demo entry point.
//!
//! Persists `TeamA` with `member1`, prints the re-read roster and commits.

use roster_cli::{bootstrap, exit_code};
use roster_core::{run_team_demo, TeamDemo};
use std::process::ExitCode;

fn main() -> ExitCode {
    let ctx = match bootstrap() {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let mut stdout = std::io::stdout().lock();
    exit_code(run_team_demo(ctx, &TeamDemo::default(), &mut stdout))
}
