use super::server::HttpServer;
use crate::component::{Component, ShutdownScope};
use crate::config::EndpointConfig;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error};

struct MetricsState {
    registry: Registry,
    scrapes: IntCounter,
}

/// Renders everything registered in `registry` in the text exposition format
pub fn metrics_router(registry: Registry) -> Result<Router> {
    let scrapes = IntCounter::new(
        "metricz_scrapes_total",
        "Number of times the metrics endpoint has been scraped",
    )
    .map_err(|e| ServiceError::component("metricz", e.to_string()))?;

    registry
        .register(Box::new(scrapes.clone()))
        .map_err(|e| ServiceError::component("metricz", e.to_string()))?;

    Ok(Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(MetricsState { registry, scrapes })))
}

async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> Response {
    debug!("Handling metrics request");
    state.scrapes.inc();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&state.registry.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        buffer,
    )
        .into_response()
}

pub struct MetriczComponent {
    server: HttpServer,
}

impl MetriczComponent {
    pub fn new(registry: Registry, config: &EndpointConfig) -> Result<Self> {
        let router = metrics_router(registry)?.layer(TimeoutLayer::new(config.request_timeout()));

        Ok(Self {
            server: HttpServer::new("metricz", config.enabled, config.address(), router),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }
}

#[async_trait]
impl Component for MetriczComponent {
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
