use crate::component::{ShutdownScope, StopSignal};
use crate::error::{Result, ServiceError};
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tracing::info;

/// Listener-backed axum server split along the component lifecycle.
///
/// `bind` claims the socket during startup, `serve` blocks for the run phase,
/// `shutdown` stops accepting and waits for in-flight requests to drain.
/// A disabled server never binds and `serve` just waits to be shut down.
pub struct HttpServer {
    name: String,
    enabled: bool,
    address: String,
    router: Mutex<Option<Router>>,
    listener: Mutex<Option<TcpListener>>,
    local_addr: Mutex<Option<SocketAddr>>,
    stop: StopSignal,
    drained: StopSignal,
    serving: AtomicBool,
}

impl HttpServer {
    pub fn new<N: Into<String>>(name: N, enabled: bool, address: String, router: Router) -> Self {
        Self {
            name: name.into(),
            enabled,
            address,
            router: Mutex::new(Some(router)),
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            stop: StopSignal::new(),
            drained: StopSignal::new(),
            serving: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Address actually bound, once `bind` has succeeded
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub async fn bind(&self) -> Result<()> {
        if !self.enabled {
            info!("{} is disabled, not binding {}", self.name, self.address);
            return Ok(());
        }

        let listener = TcpListener::bind(&self.address).await.map_err(|e| {
            ServiceError::component(
                self.name.as_str(),
                format!("failed to bind {}: {}", self.address, e),
            )
        })?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(local_addr);
        *self.listener.lock() = Some(listener);

        info!("{} listening on {}", self.name, local_addr);
        Ok(())
    }

    pub async fn serve(&self) -> Result<()> {
        let router = self.router.lock().take();
        let listener = {
            let mut slot = self.listener.lock();
            match (slot.take(), router.is_some()) {
                (Some(listener), true) => {
                    // Set under the lock so `shutdown` either finds the listener
                    // or sees that it has to wait for the drain.
                    self.serving.store(true, Ordering::SeqCst);
                    Some(listener)
                }
                _ => None,
            }
        };

        let (listener, router) = match (listener, router) {
            (Some(listener), Some(router)) => (listener, router),
            _ => {
                self.stop.wait().await;
                return Ok(());
            }
        };

        info!("Starting {} on {}", self.name, self.address);

        let stop = self.stop.clone();
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move { stop.wait().await })
            .await;

        self.drained.stop();
        info!("{} stopped serving", self.name);

        served.map_err(|e| {
            ServiceError::component(self.name.as_str(), format!("server error: {}", e))
        })
    }

    pub async fn shutdown(&self, scope: &ShutdownScope) -> Result<()> {
        self.stop.stop();

        // Never served: releasing the socket is all there is to do.
        let serving = {
            let mut slot = self.listener.lock();
            drop(slot.take());
            self.serving.load(Ordering::SeqCst)
        };

        if serving {
            scope.bound(self.drained.wait()).await?;
        }
        Ok(())
    }
}
