//! Fixtures shared by unit and integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast::{self, error::RecvError};

use crate::core::condition::TestExpression;
use crate::core::types::{AdjustmentConfig, RunConfig, StateEvent};

/// The reference scenario: x=2, y=3, add, `output > 10`, +1/+2 adjustments.
/// Passes on the third evaluation with x=4, y=7.
pub fn scenario_config() -> RunConfig {
    RunConfig::default()
}

/// A run whose test can never pass; it ends only by timeout.
pub fn never_passing_config(timeout_ms: u64) -> RunConfig {
    let mut config = RunConfig {
        test: TestExpression::new("output > 1000000"),
        x_adjustment: AdjustmentConfig::new("increment", "0"),
        y_adjustment: AdjustmentConfig::new("increment", "0"),
        ..RunConfig::default()
    };
    config.limits.timeout_ms = timeout_ms;
    config.limits.max_iterations = u64::MAX;
    config
}

/// Receive until a terminal event arrives, skipping over lag.
///
/// Panics if the channel closes first.
pub async fn next_terminal(rx: &mut broadcast::Receiver<StateEvent>) -> StateEvent {
    loop {
        match rx.recv().await {
            Ok(event) if event.phase.is_terminal() => return event,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => panic!("event channel closed before a terminal event"),
        }
    }
}

/// A temporary directory holding one config file.
pub struct ConfigDir {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl ConfigDir {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(crate::io::config::DEFAULT_CONFIG_FILE);
        Ok(Self { dir, path })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the config file (may not exist yet).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, contents: &str) -> std::io::Result<()> {
        fs::write(&self.path, contents)
    }
}
