use super::logger::{Logger, TracingLogger};
use super::types::LifecycleState;
use super::OrchestratorBuilder;
use crate::component::Component;
use crate::error::{Result, ServiceError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Hosts an ordered set of components and drives their shared lifecycle.
///
/// Registration order is the startup order and the shutdown sweep order.
/// An orchestrator launches at most once; see [`Orchestrator::launch`].
pub struct Orchestrator {
    pub(super) components: Vec<Arc<dyn Component>>,
    pub(super) shutdown_timeout: Duration,
    pub(super) logger: Arc<dyn Logger>,
    pub(super) state: watch::Sender<LifecycleState>,
}

impl Orchestrator {
    /// Create an orchestrator over `components` with the default timeout and logger
    pub fn new(components: Vec<Arc<dyn Component>>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);

        Self {
            components,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            logger: Arc::new(TracingLogger),
            state,
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Append a component. Rejected once launch has begun.
    pub fn add_component(&mut self, component: Arc<dyn Component>) -> Result<()> {
        if self.state() != LifecycleState::Idle {
            return Err(ServiceError::AlreadyLaunched);
        }
        self.components.push(component);
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
