//! Iterative convergence engine.
//!
//! Two managed variables are combined by a primary operation, the result is
//! checked against a test expression, and while the test fails both variables
//! are adjusted and the loop repeats. A wall-clock timeout and an iteration cap
//! bound every run.
//!
//! - **[`core`]**: Pure, deterministic logic (registry, coercion, test
//!   evaluation, the run state machine). No I/O, no clocks beyond `Instant`.
//! - **[`io`]**: Config files and run logs.
//!
//! Drivers coordinate the two: [`looping`] runs a machine to completion on the
//! current thread for the CLI, [`controller`] runs it on Tokio with
//! cancellation and broadcast events for long-lived hosts.

pub mod controller;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
