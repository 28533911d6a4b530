use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Startup error in {component}: {source}")]
    Startup {
        component: String,
        #[source]
        source: Box<ServiceError>,
    },

    #[error("Close error in {component}: {source}")]
    Close {
        component: String,
        #[source]
        source: Box<ServiceError>,
    },

    #[error("Killed after {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    #[error("Orchestrator has already been launched")]
    AlreadyLaunched,

    #[error("Failed to register shutdown signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Component {component} panicked: {message}")]
    Panicked { component: String, message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub(crate) fn startup<C: Into<String>>(component: C, source: ServiceError) -> Self {
        Self::Startup {
            component: component.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn close<C: Into<String>>(component: C, source: ServiceError) -> Self {
        Self::Close {
            component: component.into(),
            source: Box::new(source),
        }
    }

    /// Short stable label for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Startup { .. } => "startup_failed",
            ServiceError::Close { .. } => "close_failed",
            ServiceError::ShutdownTimeout { .. } => "shutdown_timeout",
            ServiceError::AlreadyLaunched => "already_launched",
            ServiceError::Signal(_) => "signal_registration_failed",
            ServiceError::Panicked { .. } => "component_panicked",
            ServiceError::Component { .. } => "component_error",
            ServiceError::Config(_) => "config_error",
            ServiceError::Io(_) => "io_error",
        }
    }

    /// True when the error came out of the shutdown sweep rather than the
    /// component that triggered it.
    pub fn is_shutdown_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::Close { .. } | ServiceError::ShutdownTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
