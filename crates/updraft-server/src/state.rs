//! Application state for the API server.

use std::sync::Arc;

use updraft_core::UpdateOrchestrator;

use crate::window::BroadcastWindow;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Update orchestrator serving the requests.
    pub orchestrator: UpdateOrchestrator,
    /// Window the orchestrator pushes events to.
    pub window: Arc<BroadcastWindow>,
}

impl AppState {
    /// Creates the state. `window` must be the window `orchestrator` sends to.
    pub fn new(orchestrator: UpdateOrchestrator, window: Arc<BroadcastWindow>) -> Self {
        Self {
            orchestrator,
            window,
        }
    }
}
