//! Named variable values, stored as text.

use std::collections::BTreeMap;

use crate::core::numeric;

/// Current value of each named variable.
///
/// `set` accepts any text: a variable may hold non-numeric input between
/// edits. Numeric coercion happens when a value is read through [`number`].
///
/// [`number`]: VariableStore::number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    values: BTreeMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Coerced value; `NaN` when the variable is missing or non-numeric.
    pub fn number(&self, name: &str) -> f64 {
        self.get(name).map_or(f64::NAN, numeric::coerce)
    }

    /// Store a number using the canonical text rendering.
    pub fn set_number(&mut self, name: impl Into<String>, value: f64) {
        self.set(name, numeric::format(value));
    }

    /// Text value or empty string when unset.
    pub fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_accepts_any_text() {
        let mut store = VariableStore::new();
        store.set("x", "12abc");
        assert_eq!(store.get("x"), Some("12abc"));
        assert!(store.number("x").is_nan());
    }

    #[test]
    fn missing_variable_reads_as_nan() {
        let store = VariableStore::new();
        assert_eq!(store.get("y"), None);
        assert!(store.number("y").is_nan());
        assert_eq!(store.text("y"), "");
    }

    #[test]
    fn supports_arbitrary_names() {
        let mut store = VariableStore::new();
        store.set("n_k", "1");
        store.set("a", "2");
        store.set_number("z", 3.5);
        assert_eq!(store.number("n_k") + store.number("a"), 3.0);
        assert_eq!(store.get("z"), Some("3.5"));
    }
}
