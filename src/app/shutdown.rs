use super::logger::Logger;
use super::Orchestrator;
use crate::component::{Component, ShutdownScope};
use crate::error::{Result, ServiceError};
use std::sync::Arc;

/// How a sweep treats a failing close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SweepMode {
    /// Stop at the first failing close and report it.
    FailFast,
    /// Log the failure, keep closing, report the last failure seen.
    BestEffort,
}

impl Orchestrator {
    /// Close `components` in order under one shared deadline.
    ///
    /// The sweep runs on its own task so the deadline holds even when a close
    /// never returns. On expiry the scope is cancelled and the sweep task is
    /// left to wind down on its own.
    pub(super) async fn sweep(
        &self,
        components: Vec<Arc<dyn Component>>,
        mode: SweepMode,
    ) -> Result<()> {
        let timeout = self.shutdown_timeout;
        let scope = ShutdownScope::new(timeout);

        let mut sweep = tokio::spawn(close_in_order(
            components,
            scope.clone(),
            Arc::clone(&self.logger),
            mode,
        ));

        tokio::select! {
            biased;
            joined = &mut sweep => match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(ServiceError::Panicked {
                    component: "shutdown sweep".to_string(),
                    message: e.to_string(),
                }),
            },
            _ = scope.expired() => {
                scope.expire();
                self.logger
                    .info(&format!("Shutdown did not complete within {:?}", timeout));
                Err(ServiceError::ShutdownTimeout { timeout })
            }
        }
    }
}

async fn close_in_order(
    components: Vec<Arc<dyn Component>>,
    scope: ShutdownScope,
    logger: Arc<dyn Logger>,
    mode: SweepMode,
) -> Result<()> {
    let mut outcome = Ok(());

    for component in &components {
        logger.info(&format!("Closing component {}", component.name()));

        if let Err(e) = component.close(&scope).await {
            match mode {
                SweepMode::FailFast => {
                    logger.info(&format!(
                        "Component {} closed with error {}",
                        component.name(),
                        e
                    ));
                    return Err(ServiceError::close(component.name(), e));
                }
                SweepMode::BestEffort => {
                    logger.info(&format!(
                        "Shutting down {} did not complete: {}",
                        component.name(),
                        e
                    ));
                    outcome = Err(ServiceError::close(component.name(), e));
                }
            }
        }
    }

    outcome
}
