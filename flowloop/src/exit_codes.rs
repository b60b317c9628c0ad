//! Stable exit codes for flowloop CLI commands.

use crate::core::types::RunOutcome;

/// Command succeeded or the run's test passed.
pub const OK: i32 = 0;
/// Invalid config, arguments or test expression, or the run failed.
pub const INVALID: i32 = 1;
/// `flowloop run` hit its deadline or iteration cap.
pub const TIMED_OUT: i32 = 2;
/// `flowloop check` evaluated a well-formed test to false.
pub const CHECK_FAILED: i32 = 3;

pub fn for_outcome(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Succeeded(_) => OK,
        RunOutcome::TimedOut(_) => TIMED_OUT,
        RunOutcome::Failed { .. } => INVALID,
    }
}
