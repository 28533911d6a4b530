use super::{LifecycleState, Orchestrator};
use tokio::sync::watch;

impl Orchestrator {
    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Receiver that observes every lifecycle transition
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub(super) fn set_state(&self, state: LifecycleState) {
        self.state.send_replace(state);
        self.logger
            .debug(&format!("Lifecycle state changed to: {:?}", state));
    }
}
