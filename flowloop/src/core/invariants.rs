//! Static checks on a run configuration.
//!
//! These run before a run starts (CLI `validate`, config loading, the HTTP
//! start endpoint) and report problems as stable messages. The engine itself
//! does not depend on them: a run started with a bad configuration still ends
//! in a well-defined phase.
//!
//! [`validate_config`] lists blocking problems. [`config_warnings`] lists
//! test-shape problems; a run with a malformed test still starts and reports
//! the problem as a diagnostic on every iteration.

use crate::core::condition::OUTPUT;
use crate::core::registry;
use crate::core::types::{AdjustmentConfig, RunConfig};

/// Validate `config`. Returns a list of stable error messages (empty on success).
pub fn validate_config(config: &RunConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let primary = &config.primary.selection.operation_id;
    if let Err(err) = registry::lookup(primary) {
        errors.push(format!(
            "primary: {err} (known: {})",
            registry::primary_ids().join(", ")
        ));
    }

    check_adjustment("x_adjustment", &config.x_adjustment, &mut errors);
    check_adjustment("y_adjustment", &config.y_adjustment, &mut errors);

    if config.limits.timeout_ms == 0 {
        errors.push("limits.timeout_ms must be > 0".to_string());
    }
    if config.limits.max_iterations == 0 {
        errors.push("limits.max_iterations must be > 0".to_string());
    }

    errors
}

/// Non-blocking problems: a test that can never evaluate.
pub fn config_warnings(config: &RunConfig) -> Vec<String> {
    match config.test.check(&[OUTPUT]) {
        Ok(()) => Vec::new(),
        Err(err) => vec![format!("test '{}': {err}", config.test)],
    }
}

fn check_adjustment(role: &str, adjustment: &AdjustmentConfig, errors: &mut Vec<String>) {
    if let Err(err) = registry::lookup_adjustment(&adjustment.selection.operation_id) {
        errors.push(format!("{role}: {err}"));
    }
    for id in adjustment.allowed_operations.iter().flatten() {
        if registry::lookup_adjustment(id).is_err() {
            errors.push(format!(
                "{role}: allowed_operations entry '{id}' is not an adjustment operation \
                 (expected one of: {})",
                registry::adjustment_ids().join(", ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::condition::TestExpression;
    use crate::core::types::{AdjustmentConfig, PrimaryConfig};

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RunConfig::default()).is_empty());
    }

    #[test]
    fn reports_every_problem() {
        let config = RunConfig {
            primary: PrimaryConfig::new("pow"),
            x_adjustment: AdjustmentConfig::new("add", "1"),
            test: TestExpression::new("output >"),
            ..RunConfig::default()
        };
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors[0].contains("unknown operation 'pow'"));
        assert!(errors[1].starts_with("x_adjustment"));
    }

    #[test]
    fn malformed_test_is_a_warning_not_an_error() {
        let config = RunConfig {
            test: TestExpression::new("output >"),
            ..RunConfig::default()
        };
        assert!(validate_config(&config).is_empty());
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("expected 3 tokens"), "{warnings:?}");
        assert!(config_warnings(&RunConfig::default()).is_empty());
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = RunConfig::default();
        config.limits.timeout_ms = 0;
        config.limits.max_iterations = 0;
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.contains("timeout_ms")));
        assert!(errors.iter().any(|e| e.contains("max_iterations")));
    }

    #[test]
    fn rejects_unknown_allow_list_entries() {
        let mut config = RunConfig::default();
        config.y_adjustment.allowed_operations =
            Some(vec!["increment".to_string(), "square".to_string()]);
        let errors = validate_config(&config);
        assert_eq!(
            errors,
            vec![
                "y_adjustment: allowed_operations entry 'square' is not an adjustment operation \
                 (expected one of: increment, decrement, multiply, divide)"
            ]
        );
    }
}
