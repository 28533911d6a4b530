use super::server::HttpServer;
use crate::component::{Component, ShutdownScope};
use crate::config::EndpointConfig;
use crate::error::Result;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::debug;

/// Anything that can report whether it is healthy
#[async_trait]
pub trait Checkable: Send + Sync {
    async fn healthz(&self) -> Result<()>;
}

/// Adapts an async closure into a [`Checkable`]
pub struct CheckFn<F>(pub F);

#[async_trait]
impl<F, Fut> Checkable for CheckFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn healthz(&self) -> Result<()> {
        (self.0)().await
    }
}

/// A named health check
#[derive(Clone)]
pub struct Provider {
    pub name: String,
    pub check: Arc<dyn Checkable>,
}

impl Provider {
    pub fn new<N: Into<String>, C: Checkable + 'static>(name: N, check: C) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn from_fn<N, F, Fut>(name: N, check: F) -> Self
    where
        N: Into<String>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(name, CheckFn(check))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthzResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceStatus>,
    pub healthy: bool,
}

/// Runs every provider's check and builds the `/healthz` router
pub struct HealthChecker {
    providers: Vec<Provider>,
}

impl HealthChecker {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub async fn check(&self) -> HealthzResponse {
        let mut response = HealthzResponse {
            services: Vec::with_capacity(self.providers.len()),
            healthy: true,
        };

        for provider in &self.providers {
            let status = match provider.check.healthz().await {
                Ok(()) => ServiceStatus {
                    name: provider.name.clone(),
                    healthy: true,
                    error_message: None,
                },
                Err(e) => {
                    response.healthy = false;
                    ServiceStatus {
                        name: provider.name.clone(),
                        healthy: false,
                        error_message: Some(e.to_string()),
                    }
                }
            };
            response.services.push(status);
        }

        response
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/healthz", get(healthz_handler))
            .route("/liveliness", get(liveliness_handler))
            .with_state(Arc::new(self))
    }
}

async fn healthz_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    debug!("Handling healthz request");

    if checker.providers.is_empty() {
        return (StatusCode::OK, "OK").into_response();
    }

    let response = checker.check().await;
    let status = if response.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response)).into_response()
}

async fn liveliness_handler() -> &'static str {
    "OK"
}

/// Health endpoint: `/healthz` aggregates the providers, `/liveliness`
/// always answers `OK`.
pub struct HealthzComponent {
    server: HttpServer,
}

impl HealthzComponent {
    pub fn new(providers: Vec<Provider>, config: &EndpointConfig) -> Self {
        let router = HealthChecker::new(providers)
            .router()
            .layer(TimeoutLayer::new(config.request_timeout()));

        Self {
            server: HttpServer::new("healthz", config.enabled, config.address(), router),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }
}

#[async_trait]
impl Component for HealthzComponent {
    fn name(&self) -> &str {
        self.server.name()
    }

    async fn startup(&self) -> Result<()> {
        self.server.bind().await
    }

    async fn run(&self) -> Result<()> {
        self.server.serve().await
    }

    async fn close(&self, scope: &ShutdownScope) -> Result<()> {
        self.server.shutdown(scope).await
    }
}
