use super::server::HttpServer;
use crate::component::{Component, ShutdownScope};
use crate::config::{CorsConfig, ServerConfig};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;

/// Serves an application router according to a [`ServerConfig`].
pub struct HttpComponent {
    server: HttpServer,
}

impl HttpComponent {
    pub fn new(router: Router, config: &ServerConfig) -> Result<Self> {
        let router = build_router(router, config)?;

        Ok(Self {
            server: HttpServer::new("http", config.enabled, config.address(), router),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }
}

#[async_trait]
impl Component for HttpComponent {
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

/// Wrap `router` with the request timeout and, when configured, CORS.
pub(crate) fn build_router(router: Router, config: &ServerConfig) -> Result<Router> {
    let router = router.layer(TimeoutLayer::new(config.request_timeout()));

    match &config.cors {
        Some(cors) => Ok(router.layer(cors_layer(cors)?)),
        None => Ok(router),
    }
}

fn cors_layer(cors: &CorsConfig) -> Result<CorsLayer> {
    let wildcard = cors.allowed_origins.iter().any(|origin| origin == "*");
    if wildcard && cors.allow_credentials {
        return Err(ServiceError::component(
            "http",
            "CORS credentials cannot be combined with a wildcard origin",
        ));
    }

    let allow_origin = if wildcard {
        AllowOrigin::any()
    } else {
        let origins = cors
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| {
                    ServiceError::component("http", format!("invalid CORS origin {}: {}", origin, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    let headers = cors
        .allowed_headers
        .iter()
        .map(|header| {
            HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
                ServiceError::component("http", format!("invalid CORS header {}: {}", header, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::HEAD])
        .allow_headers(AllowHeaders::list(headers))
        .allow_credentials(cors.allow_credentials))
}
