//! Static operation catalog.
//!
//! Every operation has a primary form combining the two tracked variables
//! (`x ∘ y`) and, except for `add`, an adjustment form nudging one operand by
//! a factor (`v ∘ f`). The catalog is fixed at compile time and has no
//! mutation API.

use serde::Serialize;

use crate::core::error::DomainError;

/// One named parameter an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Increment,
    Decrement,
    Multiply,
    Divide,
    Add,
}

/// Immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub id: &'static str,
    pub display_name: &'static str,
    pub params: &'static [ParamSpec],
    /// Whether the operation has an adjustment form.
    pub adjusts: bool,
    #[serde(skip)]
    kind: Kind,
}

const FACTOR: &[ParamSpec] = &[ParamSpec {
    name: "factor",
    default: Some("1"),
}];

const DIVISOR: &[ParamSpec] = &[ParamSpec {
    name: "divisor",
    default: Some("1"),
}];

static CATALOG: [Operation; 5] = [
    Operation {
        id: "increment",
        display_name: "Increment",
        params: FACTOR,
        adjusts: true,
        kind: Kind::Increment,
    },
    Operation {
        id: "decrement",
        display_name: "Decrement",
        params: FACTOR,
        adjusts: true,
        kind: Kind::Decrement,
    },
    Operation {
        id: "multiply",
        display_name: "Multiply",
        params: FACTOR,
        adjusts: true,
        kind: Kind::Multiply,
    },
    Operation {
        id: "divide",
        display_name: "Divide",
        params: DIVISOR,
        adjusts: true,
        kind: Kind::Divide,
    },
    Operation {
        id: "add",
        display_name: "Add",
        params: &[],
        adjusts: false,
        kind: Kind::Add,
    },
];

impl Operation {
    /// Primary form: combine `x` and `y` into an output.
    pub fn combine(&self, x: f64, y: f64) -> f64 {
        match self.kind {
            Kind::Increment | Kind::Add => x + y,
            Kind::Decrement => x - y,
            Kind::Multiply => x * y,
            Kind::Divide => x / y,
        }
    }

    /// Adjustment form: `None` when the operation cannot adjust.
    ///
    /// Division by zero follows IEEE-754 and yields a non-finite value.
    pub fn adjust(&self, value: f64, factor: f64) -> Option<f64> {
        match self.kind {
            Kind::Increment => Some(value + factor),
            Kind::Decrement => Some(value - factor),
            Kind::Multiply => Some(value * factor),
            Kind::Divide => Some(value / factor),
            Kind::Add => None,
        }
    }

    /// Default of the first declared parameter, used when a selection omits it.
    pub fn default_param(&self) -> Option<(&'static str, &'static str)> {
        self.params
            .first()
            .and_then(|param| param.default.map(|default| (param.name, default)))
    }
}

/// Look up an operation by id.
pub fn lookup(id: &str) -> Result<&'static Operation, DomainError> {
    CATALOG
        .iter()
        .find(|op| op.id == id)
        .ok_or_else(|| DomainError::UnknownOperation { id: id.to_string() })
}

/// Look up an operation that must have an adjustment form.
pub fn lookup_adjustment(id: &str) -> Result<&'static Operation, DomainError> {
    let op = lookup(id)?;
    if !op.adjusts {
        return Err(DomainError::UnsupportedAdjustment { id: id.to_string() });
    }
    Ok(op)
}

/// Full catalog in stable display order.
pub fn operations() -> &'static [Operation] {
    &CATALOG
}

/// Ids valid as a primary operation.
pub fn primary_ids() -> Vec<&'static str> {
    CATALOG.iter().map(|op| op.id).collect()
}

/// Ids valid as an adjustment operation.
pub fn adjustment_ids() -> Vec<&'static str> {
    CATALOG
        .iter()
        .filter(|op| op.adjusts)
        .map(|op| op.id)
        .collect()
}
