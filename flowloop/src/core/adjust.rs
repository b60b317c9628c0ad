//! Adjustment resolution for a single operand.

use serde::{Deserialize, Serialize};

use crate::core::error::DomainError;
use crate::core::numeric;
use crate::core::registry;

/// Which allow-list rejected an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Operation,
    Factor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjusted {
    /// The operation ran; the value may be non-finite.
    Applied(f64),
    /// An allow-list rejected the call and the value is unchanged.
    Skipped { value: f64, rejected: Rejection },
}

impl Adjusted {
    pub fn value(&self) -> f64 {
        match *self {
            Self::Applied(value) | Self::Skipped { value, .. } => value,
        }
    }
}

/// Apply `operation_id` with `factor` to `value`.
///
/// Allow-lists are only enforced when they hold more than one entry; an empty
/// or single-entry list accepts anything. Factors are matched numerically, so
/// `"1"` and `"1.0"` are the same entry.
///
/// Unknown ids and operations without an adjustment form are errors, checked
/// before any allow-list.
pub fn apply(
    value: f64,
    operation_id: &str,
    factor: &str,
    allowed_operations: Option<&[String]>,
    allowed_factors: Option<&[String]>,
) -> Result<Adjusted, DomainError> {
    let op = registry::lookup_adjustment(operation_id)?;

    if let Some(allowed) = enforced(allowed_operations) {
        if !allowed.iter().any(|id| id == operation_id) {
            return Ok(Adjusted::Skipped {
                value,
                rejected: Rejection::Operation,
            });
        }
    }

    let factor_value = numeric::coerce(factor);
    if let Some(allowed) = enforced(allowed_factors) {
        if !allowed
            .iter()
            .any(|entry| numeric::coerce(entry) == factor_value)
        {
            return Ok(Adjusted::Skipped {
                value,
                rejected: Rejection::Factor,
            });
        }
    }

    // `lookup_adjustment` guarantees an adjustment form.
    let adjusted = op.adjust(value, factor_value).unwrap_or(value);
    Ok(Adjusted::Applied(adjusted))
}

fn enforced(list: Option<&[String]>) -> Option<&[String]> {
    list.filter(|entries| entries.len() > 1)
}
