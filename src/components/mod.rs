//! Ready-made [`Component`](crate::Component) implementations.

mod cron;
mod lifecycle;
mod queue;

#[cfg(feature = "http")]
mod healthz;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "metrics")]
mod metricz;
#[cfg(feature = "http")]
mod server;

#[cfg(test)]
mod tests;

pub use cron::{CronComponent, JobFn, ScheduledJob};
pub use lifecycle::LifecycleComponent;
pub use queue::{handler, QueueComponent, QueueContext, QueueHandler};

#[cfg(feature = "http")]
pub use healthz::{
    CheckFn, Checkable, HealthChecker, HealthzComponent, HealthzResponse, Provider, ServiceStatus,
};
#[cfg(feature = "http")]
pub use http::HttpComponent;
#[cfg(feature = "metrics")]
pub use metricz::{metrics_router, MetriczComponent};
#[cfg(feature = "http")]
pub use server::HttpServer;
