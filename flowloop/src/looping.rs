//! Synchronous driver for `flowloop run`.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::core::budget::remaining_budget;
use crate::core::machine::Machine;
use crate::core::types::{Phase, RunConfig, RunId, RunOutcome, StateEvent, TimeoutReason};

/// Run `config` to a terminal phase on the current thread.
///
/// The wall-clock budget (`limits.timeout_ms`) is checked before every
/// transition; once it is spent the run is forced into `TimedOut`. Every
/// event, including the terminal one, is passed to `on_event` in order.
#[instrument(skip_all, fields(timeout_ms = config.limits.timeout_ms))]
pub fn run_loop<F: FnMut(&StateEvent)>(config: &RunConfig, mut on_event: F) -> RunOutcome {
    let mut machine = Machine::new(RunId(1), config.clone());
    let deadline = Instant::now() + Duration::from_millis(config.limits.timeout_ms);

    let started = machine.start();
    on_event(&started);

    while !machine.phase().is_terminal() {
        let event = if remaining_budget(deadline, Instant::now()).is_none() {
            machine.time_out(TimeoutReason::Deadline)
        } else {
            machine.step()
        };
        let Some(event) = event else { break };
        debug!(phase = ?event.phase, iteration = event.iteration, x = %event.x, y = %event.y, "transition");
        for diagnostic in &event.diagnostics {
            debug!(?diagnostic, "diagnostic");
        }
        on_event(&event);
    }

    let outcome = machine
        .outcome()
        .cloned()
        .unwrap_or_else(|| RunOutcome::Failed {
            error: format!("run stopped in phase {:?}", machine.phase()),
        });
    match outcome.phase() {
        Phase::Succeeded => info!(iterations = machine.state().iteration, "run succeeded"),
        Phase::TimedOut => warn!(iterations = machine.state().iteration, "run timed out"),
        _ => warn!(?outcome, "run failed"),
    }
    outcome
}
