//! Run configuration stored as TOML (default `flowloop.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::core::invariants::validate_config;
use crate::core::types::RunConfig;
use crate::io::write_atomic;

/// JSON Schema for the configuration document (Draft 2020-12).
pub const RUN_CONFIG_SCHEMA: &str = include_str!("../../schemas/run_config.schema.json");

/// Config file name used when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "flowloop.toml";

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = RunConfig::default();
        validate(&cfg)?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("load {}", path.display()))
}

/// Parse TOML text: schema conformance, then decoding, then semantic checks.
pub fn parse_config(contents: &str) -> Result<RunConfig> {
    let value: Value = toml::from_str(contents).context("parse config toml")?;
    validate_schema(&value)?;
    let cfg: RunConfig = serde_json::from_value(value).context("decode config")?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Semantic validation (known operations, non-zero limits). Test-shape
/// problems are warnings, see [`crate::core::invariants::config_warnings`].
pub fn validate(cfg: &RunConfig) -> Result<()> {
    let errors = validate_config(cfg);
    if !errors.is_empty() {
        bail!("invalid config:\n- {}", errors.join("\n- "));
    }
    Ok(())
}

/// Validate a JSON instance against [`RUN_CONFIG_SCHEMA`].
pub fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(RUN_CONFIG_SCHEMA).context("parse config schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile config schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Atomically write config to disk.
pub fn write_config(path: &Path, cfg: &RunConfig) -> Result<()> {
    validate(cfg)?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AdjustmentConfig, PrimaryConfig};

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("flowloop.toml");
        let mut cfg = RunConfig {
            primary: PrimaryConfig::new("multiply"),
            y_adjustment: AdjustmentConfig::new("decrement", "0.5"),
            ..RunConfig::default()
        };
        cfg.limits.timeout_ms = 250;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = parse_config(
            r#"
x = "10"
test = "output <= 0"

[x_adjustment]
operation_id = "multiply"
parameters = { factor = "2" }
allowed_factors = ["2", "3"]

[limits]
timeout_ms = 50
"#,
        )
        .expect("parse");
        assert_eq!(cfg.x, "10");
        assert_eq!(cfg.test.as_str(), "output <= 0");
        assert_eq!(cfg.limits.timeout_ms, 50);
        assert_eq!(cfg.limits.max_iterations, RunConfig::default().limits.max_iterations);
        assert_eq!(cfg.primary, RunConfig::default().primary);
        assert_eq!(cfg.x_adjustment.selection.operation_id, "multiply");
        assert_eq!(
            cfg.x_adjustment.allowed_factors,
            Some(vec!["2".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn schema_rejects_numeric_variable_values() {
        let err = parse_config("x = 2\n").unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn schema_rejects_unknown_keys() {
        let err = parse_config("[primary]\noperation_id = \"add\"\nfactor = \"2\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn semantic_errors_are_listed() {
        let err = parse_config("[primary]\noperation_id = \"pow\"\n").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("invalid config"), "{msg}");
        assert!(msg.contains("unknown operation 'pow'"), "{msg}");
    }

    #[test]
    fn malformed_test_still_loads() {
        let cfg = parse_config("test = \"output >\"\n").expect("parse");
        assert_eq!(cfg.test.as_str(), "output >");
    }

    #[test]
    fn write_refuses_invalid_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("flowloop.toml");
        let cfg = RunConfig {
            primary: PrimaryConfig::new("pow"),
            ..RunConfig::default()
        };
        assert!(write_config(&path, &cfg).is_err());
        assert!(!path.exists());
    }
}
