//! Shared types for the convergence engine.
//!
//! Configuration types are plain data owned by the caller and handed to the
//! engine as one snapshot per run. Event and report types are what the engine
//! hands back; they serialize to stable JSON for the boundary layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::adjust::Rejection;
use crate::core::condition::{Indeterminate, TestExpression};

/// Name of the first managed variable.
pub const X: &str = "x";
/// Name of the second managed variable.
pub const Y: &str = "y";

/// Default wall-clock budget for one run.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;
/// Default number of primary-operation evaluations before a run is cut off.
pub const DEFAULT_MAX_ITERATIONS: u64 = 100_000;

/// An operation id plus its parameter values (name -> text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSelection {
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl OperationSelection {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Primary operation role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryConfig {
    #[serde(flatten)]
    pub selection: OperationSelection,
}

impl PrimaryConfig {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            selection: OperationSelection::new(operation_id),
        }
    }
}

/// Per-variable adjustment role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    #[serde(flatten)]
    pub selection: OperationSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_operations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_factors: Option<Vec<String>>,
}

impl AdjustmentConfig {
    /// Adjustment with an explicit `factor` parameter.
    pub fn new(operation_id: impl Into<String>, factor: impl Into<String>) -> Self {
        Self {
            selection: OperationSelection::new(operation_id).with_param("factor", factor),
            allowed_operations: None,
            allowed_factors: None,
        }
    }
}

/// Termination guards for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Wall-clock budget in milliseconds, armed when the run starts.
    pub timeout_ms: u64,
    /// Maximum primary-operation evaluations.
    pub max_iterations: u64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Complete configuration snapshot for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub x: String,
    pub y: String,
    pub test: TestExpression,
    pub primary: PrimaryConfig,
    pub x_adjustment: AdjustmentConfig,
    pub y_adjustment: AdjustmentConfig,
    pub limits: RunLimits,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            x: "2".to_string(),
            y: "3".to_string(),
            test: TestExpression::new("output > 10"),
            primary: PrimaryConfig::new("add"),
            x_adjustment: AdjustmentConfig::new("increment", "1"),
            y_adjustment: AdjustmentConfig::new("increment", "2"),
            limits: RunLimits::default(),
        }
    }
}

/// Monotonic identifier of a started run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Testing,
    Adjusting,
    Succeeded,
    TimedOut,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::TimedOut | Self::Failed)
    }
}

/// Role an operation selection plays in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Primary,
    XAdjustment,
    YAdjustment,
}

/// Non-fatal outcomes and run failures, attached to state events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The referenced operation id is not in the registry.
    UnknownOperation { role: Role, operation_id: String },
    /// The operation cannot be used as an adjustment.
    UnsupportedAdjustment { role: Role, operation_id: String },
    /// The test did not parse; counted as a failed test.
    MalformedTest { test: String, detail: Indeterminate },
    /// An operand was not finite; counted as a failed test.
    InvalidNumericState { test: String, detail: Indeterminate },
    /// An allow-list rejected the adjustment; the variable is unchanged.
    ValidationSkipped {
        variable: String,
        operation_id: String,
        factor: String,
        rejected: Rejection,
    },
}

/// Why a run ended as timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutReason {
    /// The wall-clock budget elapsed.
    Deadline,
    /// The iteration cap was reached first.
    IterationCap,
}

/// Report emitted when the test passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub summary: String,
    pub output: f64,
    pub x: String,
    pub y: String,
    pub iterations: u64,
}

/// Report emitted when a run is cut off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutReport {
    pub reason: TimeoutReason,
    pub elapsed_ms: u64,
    pub iterations: u64,
    pub output: Option<f64>,
    pub x: String,
    pub y: String,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded(FinalReport),
    TimedOut(TimeoutReport),
    Failed { error: String },
}

impl RunOutcome {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Succeeded(_) => Phase::Succeeded,
            Self::TimedOut(_) => Phase::TimedOut,
            Self::Failed { .. } => Phase::Failed,
        }
    }
}

/// Snapshot published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEvent {
    pub run_id: RunId,
    pub phase: Phase,
    /// 1-based index of the current iteration.
    pub iteration: u64,
    pub output: Option<f64>,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Present on the terminal event only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_classify_terminal_states() {
        assert!(Phase::Succeeded.is_terminal());
        assert!(Phase::TimedOut.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Adjusting.is_terminal());
        assert!(!Phase::Idle.is_terminal());
    }

    #[test]
    fn adjustment_config_serializes_flat() {
        let cfg = AdjustmentConfig::new("increment", "2");
        let json = serde_json::to_value(&cfg).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "operation_id": "increment", "parameters": { "factor": "2" } })
        );
    }

    #[test]
    fn run_config_fills_missing_fields_from_default() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "x": "7" }"#).expect("parse");
        assert_eq!(cfg.x, "7");
        assert_eq!(cfg.y, RunConfig::default().y);
        assert_eq!(cfg.limits.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn diagnostics_are_tagged_by_kind() {
        let diag = Diagnostic::UnknownOperation {
            role: Role::Primary,
            operation_id: "pow".to_string(),
        };
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["kind"], "unknown_operation");
        assert_eq!(json["role"], "primary");
    }
}
