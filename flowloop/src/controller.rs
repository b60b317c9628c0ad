//! Async run controller: one active run, cancellable timeout, broadcast events.
//!
//! Each run executes on its own Tokio task. Between transitions the task
//! races the next step against a `sleep_until` armed at start; the sleep is
//! dropped with the task on any terminal transition, cancellation or
//! supersession.
//!
//! Publishing and cancellation share one lock and a generation counter. A run
//! only publishes while its id is the current generation, so once
//! [`RunController::cancel_run`] or a newer [`RunController::start_run`]
//! returns, no further event of the old run reaches subscribers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::core::error::DomainError;
use crate::core::machine::{self, Machine};
use crate::core::types::{RunConfig, RunId, StateEvent, TimeoutReason};

/// Subscriber buffer. Slow subscribers see `RecvError::Lagged` rather than
/// slowing the run down.
const EVENT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct RunController {
    inner: Arc<Inner>,
}

struct Inner {
    events: broadcast::Sender<StateEvent>,
    gate: Mutex<Gate>,
}

#[derive(Default)]
struct Gate {
    generation: u64,
    active: Option<JoinHandle<()>>,
    last: Option<StateEvent>,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                events,
                gate: Mutex::new(Gate::default()),
            }),
        }
    }

    /// Start a run, cancelling any active one first (last writer wins).
    ///
    /// Unknown or unsupported operation ids are rejected before anything is
    /// cancelled or armed. Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(timeout_ms = config.limits.timeout_ms))]
    pub fn start_run(&self, config: RunConfig) -> Result<RunId, DomainError> {
        machine::preflight(&config).map_err(|(_, err)| err)?;

        let mut gate = lock(&self.inner.gate);
        gate.generation += 1;
        let run_id = RunId(gate.generation);
        if let Some(previous) = gate.active.take() {
            previous.abort();
            debug!(%run_id, "superseded previous run");
        }
        gate.active = Some(tokio::spawn(drive(
            Arc::clone(&self.inner),
            run_id,
            config,
        )));
        info!(%run_id, "run started");
        Ok(run_id)
    }

    /// Cancel the active run, if any. Idempotent.
    ///
    /// The cancelled run's last event is dropped from [`Self::snapshot`].
    pub fn cancel_run(&self) {
        let mut gate = lock(&self.inner.gate);
        if let Some(active) = gate.active.take() {
            gate.generation += 1;
            gate.last = None;
            active.abort();
            info!("run cancelled");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.events.subscribe()
    }

    /// Last published event of the current or most recently finished run.
    /// `None` before the first run and after a cancellation.
    pub fn snapshot(&self) -> Option<StateEvent> {
        lock(&self.inner.gate).last.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.gate).active.is_some()
    }
}

impl Inner {
    /// Publish `event` if its run is still current. Returns `false` once the
    /// run has been cancelled or superseded.
    ///
    /// A terminal event retires the run under the same lock, so a subscriber
    /// that receives it already sees `is_active() == false`.
    fn publish(&self, event: StateEvent) -> bool {
        let mut gate = lock(&self.gate);
        if gate.generation != event.run_id.0 {
            return false;
        }
        if event.phase.is_terminal() {
            gate.active = None;
        }
        gate.last = Some(event.clone());
        // No subscribers is not an error.
        let _ = self.events.send(event);
        true
    }
}

async fn drive(inner: Arc<Inner>, run_id: RunId, config: RunConfig) {
    let deadline = Instant::now() + Duration::from_millis(config.limits.timeout_ms);
    let mut machine = Machine::new(run_id, config);
    let timeout = tokio::time::sleep_until(deadline);
    tokio::pin!(timeout);

    if !inner.publish(machine.start()) {
        return;
    }

    while !machine.phase().is_terminal() {
        let event = tokio::select! {
            biased;
            () = &mut timeout => machine.time_out(TimeoutReason::Deadline),
            () = tokio::task::yield_now() => machine.step(),
        };
        let Some(event) = event else { break };
        if !inner.publish(event) {
            debug!(%run_id, "discarding result of cancelled run");
            return;
        }
    }

    debug!(%run_id, phase = ?machine.phase(), "run finished");
}

fn lock(gate: &Mutex<Gate>) -> MutexGuard<'_, Gate> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}
