//! The fixed 7-node chart the editor draws around the engine.
//!
//! Only ids, roles and edges are described here; layout belongs to the
//! renderer. The adjustment branch is ordered x then y, matching the order in
//! which the machine applies adjustments.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Variable,
    Operation,
    Test,
    Final,
    Adjustment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowNode {
    pub id: &'static str,
    pub role: NodeRole,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowEdge {
    pub id: &'static str,
    pub source: &'static str,
    pub target: &'static str,
    /// Branch label on edges leaving the test node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowChart {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

const fn node(id: &'static str, role: NodeRole, label: &'static str) -> FlowNode {
    FlowNode { id, role, label }
}

const fn edge(id: &'static str, source: &'static str, target: &'static str) -> FlowEdge {
    FlowEdge {
        id,
        source,
        target,
        label: None,
    }
}

/// The chart: `x → y → operation → test → final`, with the failing branch
/// `test → x-adjust → y-adjust → operation`.
pub fn fixed_flow() -> FlowChart {
    FlowChart {
        nodes: vec![
            node("x", NodeRole::Variable, "x"),
            node("y", NodeRole::Variable, "y"),
            node("operation", NodeRole::Operation, "Select Operation"),
            node("test", NodeRole::Test, "Test"),
            node("final", NodeRole::Final, "Final"),
            node("x-adjust", NodeRole::Adjustment, "adjust x"),
            node("y-adjust", NodeRole::Adjustment, "adjust y"),
        ],
        edges: vec![
            edge("x-y", "x", "y"),
            edge("y-op", "y", "operation"),
            edge("op-test", "operation", "test"),
            FlowEdge {
                label: Some("yes"),
                ..edge("test-yes", "test", "final")
            },
            FlowEdge {
                label: Some("no"),
                ..edge("test-no", "test", "x-adjust")
            },
            edge("x-adjust-y-adjust", "x-adjust", "y-adjust"),
            edge("re-run", "y-adjust", "operation"),
        ],
    }
}
