//! Hosts a fixed set of components through one process lifetime: ordered
//! startup, concurrent runs, and a deadline-bound shutdown triggered by the
//! first component exit or a termination signal.

pub mod app;
pub mod component;
pub mod components;
pub mod config;
pub mod error;

pub use app::{
    wait_for_shutdown_signal, LifecycleState, Logger, Orchestrator, OrchestratorBuilder,
    ShutdownReason, TracingLogger, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use component::{Component, ShutdownScope, StopSignal};
pub use config::{CorsConfig, EndpointConfig, LifecycleConfig, ServerConfig, ServiceConfig};
pub use error::{Result, ServiceError};
