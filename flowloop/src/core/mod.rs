//! Deterministic, pure logic for the convergence engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests. The
//! only clock access is the run start time and the elapsed time in timeout
//! reports.

pub mod adjust;
pub mod budget;
pub mod condition;
pub mod error;
pub mod flow;
pub mod invariants;
pub mod machine;
pub mod numeric;
pub mod registry;
pub mod types;
pub mod variables;
