use std::sync::Arc;

use fundboard_proto::protocol::DashboardState;
use tokio::sync::RwLock;

/// Read replica of the dashboard state.  Only `DashboardCore` publishes;
/// the HTTP API and handles read.
pub struct StateManager {
    state: Arc<RwLock<DashboardState>>,
}

impl StateManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DashboardState {
                rev: 1,
                ..DashboardState::default()
            })),
        }
    }

    pub async fn get_state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub async fn rev(&self) -> u64 {
        self.state.read().await.rev
    }

    /// Replace the published state, bumping `rev` if anything differs.
    /// Returns whether a change was published.
    pub async fn publish(&self, mut next: DashboardState) -> bool {
        let mut state = self.state.write().await;
        next.rev = state.rev;
        if *state == next {
            return false;
        }
        next.rev += 1;
        *state = next;
        true
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
