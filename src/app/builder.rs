use super::logger::Logger;
use super::orchestrator::{Orchestrator, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::component::Component;
use std::sync::Arc;
use std::time::Duration;

/// Builder for an [`Orchestrator`].
pub struct OrchestratorBuilder {
    components: Vec<Arc<dyn Component>>,
    shutdown_timeout: Duration,
    logger: Option<Arc<dyn Logger>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            logger: None,
        }
    }

    /// Register a component after the ones already added.
    pub fn component<C: Component>(mut self, component: C) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    /// Register a component that the caller keeps a handle to.
    pub fn shared_component(mut self, component: Arc<dyn Component>) -> Self {
        self.components.push(component);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Orchestrator {
        let orchestrator =
            Orchestrator::new(self.components).with_timeout(self.shutdown_timeout);

        match self.logger {
            Some(logger) => orchestrator.with_logger(logger),
            None => orchestrator,
        }
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
