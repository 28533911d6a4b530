use super::shutdown::SweepMode;
use super::{LifecycleState, Orchestrator};
use crate::component::Component;
use crate::error::{Result, ServiceError};
use std::sync::Arc;

impl Orchestrator {
    /// Start all components in registration order.
    ///
    /// Stops at the first failure. Components started before it are closed
    /// again before the failure is returned; later ones are never touched.
    pub(super) async fn start_all(&self) -> Result<()> {
        self.set_state(LifecycleState::Starting);

        for (index, component) in self.components.iter().enumerate() {
            self.logger
                .debug(&format!("Starting component {}", component.name()));

            if let Err(e) = component.startup().await {
                self.logger.info(&format!(
                    "Component {} failed to start: {}",
                    component.name(),
                    e
                ));
                self.close_started(&self.components[..index]).await;
                return Err(ServiceError::startup(component.name(), e));
            }
        }

        Ok(())
    }

    async fn close_started(&self, started: &[Arc<dyn Component>]) {
        if started.is_empty() {
            return;
        }

        self.logger.info(&format!(
            "Closing {} component(s) started before the failure",
            started.len()
        ));

        if let Err(e) = self.sweep(started.to_vec(), SweepMode::BestEffort).await {
            self.logger
                .info(&format!("Cleanup after failed startup incomplete: {}", e));
        }
    }
}
