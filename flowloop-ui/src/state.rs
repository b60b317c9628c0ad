//! Shared application state for the UI server.

use flowloop::controller::RunController;

/// Shared state accessible from all request handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// The single run controller; at most one run is active at a time.
    pub controller: RunController,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
