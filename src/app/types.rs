use std::fmt;

/// Orchestrator lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// What ended the running phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A component's run returned, with or without an error.
    ComponentExited { component: String, failed: bool },
    /// The process received a termination request.
    Signal(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::ComponentExited {
                component,
                failed: true,
            } => write!(f, "component {} failed", component),
            ShutdownReason::ComponentExited {
                component,
                failed: false,
            } => write!(f, "component {} exited", component),
            ShutdownReason::Signal(signal) => write!(f, "received {}", signal),
        }
    }
}
