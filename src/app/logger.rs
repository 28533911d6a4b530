use tracing::{debug, info};

/// Two-severity sink the orchestrator reports its phase transitions to.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
}

/// Default [`Logger`], forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        debug!(target: "nextservice::lifecycle", "{}", message);
    }

    fn info(&self, message: &str) {
        info!(target: "nextservice::lifecycle", "{}", message);
    }
}
