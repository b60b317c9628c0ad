//! The convergence state machine.
//!
//! ```text
//! Idle ─start─▶ Running ─▶ Testing ─pass─▶ Succeeded
//!                  ▲          │
//!                  │        fail / indeterminate
//!                  │          ▼
//!                  └────── Adjusting
//! ```
//!
//! Any non-terminal phase may be forced to `TimedOut` by the driver. An
//! unknown or unsupported operation moves the run to `Failed`.
//!
//! The machine is synchronous and owns both the variable store and the run
//! state. Each call to [`Machine::step`] performs exactly one transition and
//! returns the event describing it, so drivers decide when to stop (deadline,
//! cancellation) between transitions.

use std::time::Instant;

use crate::core::adjust::{self, Adjusted};
use crate::core::budget::elapsed_ms;
use crate::core::condition::{Evaluation, SymbolTable};
use crate::core::error::DomainError;
use crate::core::numeric;
use crate::core::registry;
use crate::core::types::{
    AdjustmentConfig, Diagnostic, FinalReport, Phase, Role, RunConfig, RunId, RunOutcome,
    StateEvent, TimeoutReason, TimeoutReport, X, Y,
};
use crate::core::variables::VariableStore;

/// Mutable bookkeeping for the active run.
#[derive(Debug, Clone)]
pub struct RunState {
    pub phase: Phase,
    /// Result of the latest primary operation in this run.
    pub output: Option<f64>,
    /// 1-based index of the current iteration; 0 before start.
    pub iteration: u64,
    pub started_at: Instant,
}

impl RunState {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            output: None,
            iteration: 0,
            started_at: Instant::now(),
        }
    }
}

pub struct Machine {
    run_id: RunId,
    config: RunConfig,
    store: VariableStore,
    state: RunState,
    outcome: Option<RunOutcome>,
}

/// Check every operation id before a run starts.
pub fn preflight(config: &RunConfig) -> Result<(), (Role, DomainError)> {
    registry::lookup(&config.primary.selection.operation_id).map_err(|e| (Role::Primary, e))?;
    registry::lookup_adjustment(&config.x_adjustment.selection.operation_id)
        .map_err(|e| (Role::XAdjustment, e))?;
    registry::lookup_adjustment(&config.y_adjustment.selection.operation_id)
        .map_err(|e| (Role::YAdjustment, e))?;
    Ok(())
}

impl Machine {
    pub fn new(run_id: RunId, config: RunConfig) -> Self {
        let mut store = VariableStore::new();
        store.set(X, config.x.clone());
        store.set(Y, config.y.clone());
        Self {
            run_id,
            config,
            store,
            state: RunState::idle(),
            outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// `Idle → Running`. Resets variables and run state from the config.
    ///
    /// A configuration naming an unknown or unsupported operation moves
    /// straight to `Failed`.
    pub fn start(&mut self) -> StateEvent {
        self.store.set(X, self.config.x.clone());
        self.store.set(Y, self.config.y.clone());
        self.state = RunState {
            phase: Phase::Running,
            output: None,
            iteration: 1,
            started_at: Instant::now(),
        };
        self.outcome = None;

        if let Err((role, err)) = preflight(&self.config) {
            return self.fail(role, err);
        }
        self.event(Vec::new())
    }

    /// Perform one transition. Returns `None` when idle or terminal.
    pub fn step(&mut self) -> Option<StateEvent> {
        match self.state.phase {
            Phase::Running => Some(self.run_primary()),
            Phase::Testing => Some(self.run_test()),
            Phase::Adjusting => Some(self.run_adjustments()),
            Phase::Idle | Phase::Succeeded | Phase::TimedOut | Phase::Failed => None,
        }
    }

    /// Force a non-terminal run into `TimedOut`. Returns `None` if the run
    /// already ended or never started.
    pub fn time_out(&mut self, reason: TimeoutReason) -> Option<StateEvent> {
        if self.state.phase.is_terminal() || self.state.phase == Phase::Idle {
            return None;
        }
        let report = TimeoutReport {
            reason,
            elapsed_ms: elapsed_ms(self.state.started_at, Instant::now()),
            iterations: self.state.iteration,
            output: self.state.output,
            x: self.store.text(X),
            y: self.store.text(Y),
        };
        Some(self.finish(RunOutcome::TimedOut(report), Vec::new()))
    }

    fn run_primary(&mut self) -> StateEvent {
        let op = match registry::lookup(&self.config.primary.selection.operation_id) {
            Ok(op) => op,
            Err(err) => return self.fail(Role::Primary, err),
        };
        let output = op.combine(self.store.number(X), self.store.number(Y));
        self.state.output = Some(output);
        self.state.phase = Phase::Testing;
        self.event(Vec::new())
    }

    fn run_test(&mut self) -> StateEvent {
        let Some(output) = self.state.output else {
            // The test only runs once this iteration has an output.
            self.state.phase = Phase::Running;
            return self.event(Vec::new());
        };

        let test = &self.config.test;
        match test.evaluate(&SymbolTable::with_output(output)) {
            Evaluation::Pass => {
                let x = self.store.text(X);
                let y = self.store.text(Y);
                let iterations = self.state.iteration;
                let report = FinalReport {
                    summary: format!(
                        "'{test}' passed after {iterations} iteration(s): output = {}, x = {x}, y = {y}",
                        numeric::format(output)
                    ),
                    output,
                    x,
                    y,
                    iterations,
                };
                self.finish(RunOutcome::Succeeded(report), Vec::new())
            }
            Evaluation::Fail => {
                self.state.phase = Phase::Adjusting;
                self.event(Vec::new())
            }
            Evaluation::Indeterminate(detail) => {
                let test = test.as_str().to_string();
                let diagnostic = if detail.is_malformed() {
                    Diagnostic::MalformedTest { test, detail }
                } else {
                    Diagnostic::InvalidNumericState { test, detail }
                };
                self.state.phase = Phase::Adjusting;
                self.event(vec![diagnostic])
            }
        }
    }

    fn run_adjustments(&mut self) -> StateEvent {
        let mut diagnostics = Vec::new();
        // Fixed order: x, then y.
        let roles = [
            (X, Role::XAdjustment, &self.config.x_adjustment),
            (Y, Role::YAdjustment, &self.config.y_adjustment),
        ];
        let mut failure = None;
        for (name, role, adjustment) in roles {
            match adjust_variable(&mut self.store, name, adjustment) {
                Ok(Some(diagnostic)) => diagnostics.push(diagnostic),
                Ok(None) => {}
                Err(err) => {
                    failure = Some((role, err));
                    break;
                }
            }
        }
        if let Some((role, err)) = failure {
            return self.fail(role, err);
        }

        if self.state.iteration >= self.config.limits.max_iterations {
            if let Some(mut event) = self.time_out(TimeoutReason::IterationCap) {
                event.diagnostics = diagnostics;
                return event;
            }
        }

        self.state.iteration += 1;
        self.state.phase = Phase::Running;
        self.event(diagnostics)
    }

    fn fail(&mut self, role: Role, err: DomainError) -> StateEvent {
        let error = format!("{role:?}: {err}");
        let diagnostic = match err {
            DomainError::UnknownOperation { id } => Diagnostic::UnknownOperation {
                role,
                operation_id: id,
            },
            DomainError::UnsupportedAdjustment { id } => Diagnostic::UnsupportedAdjustment {
                role,
                operation_id: id,
            },
        };
        self.finish(RunOutcome::Failed { error }, vec![diagnostic])
    }

    fn finish(&mut self, outcome: RunOutcome, diagnostics: Vec<Diagnostic>) -> StateEvent {
        self.state.phase = outcome.phase();
        self.outcome = Some(outcome);
        self.event(diagnostics)
    }

    fn event(&self, diagnostics: Vec<Diagnostic>) -> StateEvent {
        StateEvent {
            run_id: self.run_id,
            phase: self.state.phase,
            iteration: self.state.iteration,
            output: self.state.output,
            x: self.store.text(X),
            y: self.store.text(Y),
            diagnostics,
            outcome: self
                .outcome
                .clone()
                .filter(|_| self.state.phase.is_terminal()),
        }
    }
}

/// Adjust one variable in place. A rejected adjustment leaves the stored text
/// untouched and yields a diagnostic.
fn adjust_variable(
    store: &mut VariableStore,
    name: &str,
    adjustment: &AdjustmentConfig,
) -> Result<Option<Diagnostic>, DomainError> {
    let operation_id = &adjustment.selection.operation_id;
    let factor = factor_text(adjustment)?;
    let adjusted = adjust::apply(
        store.number(name),
        operation_id,
        &factor,
        adjustment.allowed_operations.as_deref(),
        adjustment.allowed_factors.as_deref(),
    )?;
    match adjusted {
        Adjusted::Applied(value) => {
            store.set_number(name, value);
            Ok(None)
        }
        Adjusted::Skipped { rejected, .. } => Ok(Some(Diagnostic::ValidationSkipped {
            variable: name.to_string(),
            operation_id: operation_id.clone(),
            factor,
            rejected,
        })),
    }
}

/// Factor text for an adjustment: the operation's declared parameter, then a
/// generic `factor` entry, then the declared default.
fn factor_text(adjustment: &AdjustmentConfig) -> Result<String, DomainError> {
    let op = registry::lookup_adjustment(&adjustment.selection.operation_id)?;
    let params = &adjustment.selection.parameters;
    let declared = op.default_param();
    let value = declared
        .and_then(|(name, _)| params.get(name))
        .or_else(|| params.get("factor"))
        .cloned()
        .or_else(|| declared.map(|(_, default)| default.to_string()))
        .unwrap_or_default();
    Ok(value)
}
