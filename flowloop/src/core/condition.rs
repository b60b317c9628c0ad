//! Test expression evaluation.
//!
//! The grammar is exactly `<operand> <comparator> <literal>`, separated by
//! whitespace. The left operand resolves through a [`SymbolTable`], the
//! comparator is one of a closed set, and the literal is coerced to a number.
//! Evaluation never executes the expression text and never fails: anything
//! that cannot be evaluated is [`Evaluation::Indeterminate`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::numeric;

/// Symbol holding the last primary-operation result.
pub const OUTPUT: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNe,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Comparator {
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNe,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            _ => return None,
        })
    }

    /// Both sides are numbers, so loose and strict equality agree.
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Self::Eq | Self::StrictEq => left == right,
            Self::Ne | Self::StrictNe => left != right,
            Self::Gt => left > right,
            Self::Lt => left < right,
            Self::Ge => left >= right,
            Self::Le => left <= right,
        }
    }
}

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Indeterminate {
    /// Wrong number of whitespace-separated tokens.
    TokenCount { found: usize },
    /// Left operand is not in the symbol table.
    UnknownOperand { operand: String },
    /// Comparator outside the allow-list.
    UnknownComparator { comparator: String },
    /// An operand coerced to `NaN` or an infinity.
    NonFinite { operand: String, value: String },
}

impl Indeterminate {
    /// Non-finite operands are a numeric problem; everything else is a malformed test.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::NonFinite { .. })
    }
}

impl fmt::Display for Indeterminate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenCount { found } => write!(f, "expected 3 tokens, found {found}"),
            Self::UnknownOperand { operand } => write!(f, "unknown operand '{operand}'"),
            Self::UnknownComparator { comparator } => {
                write!(f, "unsupported comparator '{comparator}'")
            }
            Self::NonFinite { operand, value } => {
                write!(f, "operand '{operand}' is not finite ({value})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Pass,
    Fail,
    Indeterminate(Indeterminate),
}

impl Evaluation {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Named operands a test may reference on its left-hand side.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    values: BTreeMap<String, f64>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding only `output`.
    pub fn with_output(output: f64) -> Self {
        let mut table = Self::new();
        table.insert(OUTPUT, output);
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Raw test text as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestExpression(String);

impl TestExpression {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Evaluate against `symbols`. Checks run in a fixed order: token count,
    /// left operand, comparator, then finiteness of both operands.
    pub fn evaluate(&self, symbols: &SymbolTable) -> Evaluation {
        let [left, comparator, right] = match tokens(&self.0) {
            Ok(tokens) => tokens,
            Err(reason) => return Evaluation::Indeterminate(reason),
        };

        let Some(left_value) = symbols.get(left) else {
            return Evaluation::Indeterminate(Indeterminate::UnknownOperand {
                operand: left.to_string(),
            });
        };

        let Some(comparator) = Comparator::parse(comparator) else {
            return Evaluation::Indeterminate(Indeterminate::UnknownComparator {
                comparator: comparator.to_string(),
            });
        };

        let right_value = numeric::coerce(right);
        for (operand, value) in [(left, left_value), (right, right_value)] {
            if !value.is_finite() {
                return Evaluation::Indeterminate(Indeterminate::NonFinite {
                    operand: operand.to_string(),
                    value: numeric::format(value),
                });
            }
        }

        if comparator.apply(left_value, right_value) {
            Evaluation::Pass
        } else {
            Evaluation::Fail
        }
    }

    /// Static shape check used by config validation. Only symbols named in
    /// `known` are accepted on the left, and the literal must be finite.
    pub fn check(&self, known: &[&str]) -> Result<(), Indeterminate> {
        let [left, comparator, right] = tokens(&self.0)?;
        if !known.contains(&left) {
            return Err(Indeterminate::UnknownOperand {
                operand: left.to_string(),
            });
        }
        if Comparator::parse(comparator).is_none() {
            return Err(Indeterminate::UnknownComparator {
                comparator: comparator.to_string(),
            });
        }
        let value = numeric::coerce(right);
        if !value.is_finite() {
            return Err(Indeterminate::NonFinite {
                operand: right.to_string(),
                value: numeric::format(value),
            });
        }
        Ok(())
    }
}

impl fmt::Display for TestExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn tokens(raw: &str) -> Result<[&str; 3], Indeterminate> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    <[&str; 3]>::try_from(parts.as_slice())
        .map_err(|_| Indeterminate::TokenCount { found: parts.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(raw: &str, output: f64) -> Evaluation {
        TestExpression::new(raw).evaluate(&SymbolTable::with_output(output))
    }

    #[test]
    fn greater_than_passes_and_fails() {
        assert_eq!(eval("output > 10", 11.0), Evaluation::Pass);
        assert_eq!(eval("output > 10", 9.0), Evaluation::Fail);
        assert_eq!(eval("output > 10", 10.0), Evaluation::Fail);
    }

    #[test]
    fn every_comparator_is_supported() {
        let cases = [
            ("output == 5", true),
            ("output === 5", true),
            ("output != 5", false),
            ("output !== 5", false),
            ("output >= 5", true),
            ("output <= 5", true),
            ("output < 5", false),
            ("output > 4.5", true),
        ];
        for (raw, expected) in cases {
            assert_eq!(eval(raw, 5.0).passed(), expected, "{raw}");
        }
    }

    #[test]
    fn wrong_token_count_is_indeterminate() {
        assert_eq!(
            eval("output>10", 11.0),
            Evaluation::Indeterminate(Indeterminate::TokenCount { found: 1 })
        );
        assert_eq!(
            eval("output > 10 extra", 11.0),
            Evaluation::Indeterminate(Indeterminate::TokenCount { found: 4 })
        );
        assert_eq!(
            eval("", 11.0),
            Evaluation::Indeterminate(Indeterminate::TokenCount { found: 0 })
        );
    }

    #[test]
    fn unknown_operand_is_checked_before_comparator() {
        assert_eq!(
            eval("total => 10", 11.0),
            Evaluation::Indeterminate(Indeterminate::UnknownOperand {
                operand: "total".to_string()
            })
        );
        assert_eq!(
            eval("output => 10", 11.0),
            Evaluation::Indeterminate(Indeterminate::UnknownComparator {
                comparator: "=>".to_string()
            })
        );
    }

    #[test]
    fn non_finite_operands_never_pass() {
        // `!=` against NaN would be true under plain IEEE rules.
        let result = eval("output != 5", f64::NAN);
        assert!(matches!(
            result,
            Evaluation::Indeterminate(Indeterminate::NonFinite { .. })
        ));
        assert!(!eval("output > 1", f64::INFINITY).passed());
        assert!(!eval("output < abc", 1.0).passed());
    }

    #[test]
    fn injection_text_is_just_a_bad_token() {
        let result = eval("output > 1;process.exit()", 5.0);
        assert!(matches!(
            result,
            Evaluation::Indeterminate(Indeterminate::NonFinite { .. })
        ));
    }

    #[test]
    fn check_validates_shape_without_values() {
        let known = [OUTPUT];
        assert!(TestExpression::new("output >= 3").check(&known).is_ok());
        assert!(TestExpression::new("x >= 3").check(&known).is_err());
        assert!(TestExpression::new("output ~ 3").check(&known).is_err());
        let err = TestExpression::new("output > ten")
            .check(&known)
            .unwrap_err();
        assert!(!err.is_malformed());
        assert_eq!(err.to_string(), "operand 'ten' is not finite (NaN)");
    }
}
