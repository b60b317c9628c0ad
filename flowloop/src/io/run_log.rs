//! JSON run log: configuration, every published state event and the outcome.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::{RunConfig, RunOutcome, StateEvent};
use crate::io::write_atomic;

#[derive(Debug, Clone, Serialize)]
pub struct RunLog<'a> {
    pub config: &'a RunConfig,
    pub events: &'a [StateEvent],
    pub outcome: &'a RunOutcome,
}

/// Write the log as pretty JSON with a trailing newline.
pub fn write_run_log(path: &Path, log: &RunLog<'_>) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(log).context("serialize run log")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looping::run_loop;
    use std::fs;

    #[test]
    fn writes_events_and_outcome() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs").join("run.json");
        let config = RunConfig::default();
        let mut events = Vec::new();
        let outcome = run_loop(&config, |event| events.push(event.clone()));

        write_run_log(
            &path,
            &RunLog {
                config: &config,
                events: &events,
                outcome: &outcome,
            },
        )
        .expect("write log");

        let raw = fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["outcome"]["status"], "succeeded");
        assert_eq!(value["outcome"]["output"], 11.0);
        assert_eq!(value["events"][0]["phase"], "running");
        assert!(raw.ends_with("}\n"));
    }
}
