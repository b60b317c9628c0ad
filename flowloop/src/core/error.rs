//! Domain failures that end a run.

use thiserror::Error;

/// Failures that abort a run immediately instead of degrading to `Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The referenced operation id is not in the registry.
    #[error("unknown operation '{id}'")]
    UnknownOperation { id: String },
    /// The operation exists but has no adjustment form (e.g. `add`).
    #[error("operation '{id}' cannot be used as an adjustment")]
    UnsupportedAdjustment { id: String },
}
