mod builder;
mod logger;
mod orchestrator;
mod runtime;
mod shutdown;
mod signals;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod mock;

pub use builder::OrchestratorBuilder;
pub use logger::{Logger, TracingLogger};
pub use orchestrator::{Orchestrator, DEFAULT_SHUTDOWN_TIMEOUT};
pub use signals::{wait_for_shutdown_signal, ShutdownSignals};
pub use types::{LifecycleState, ShutdownReason};
