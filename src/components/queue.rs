use crate::component::{Component, ShutdownScope, StopSignal};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

const HANDLER_ERROR_BUFFER: usize = 10;

/// Handed to every queue handler
#[derive(Clone)]
pub struct QueueContext {
    errors: mpsc::Sender<ServiceError>,
    stop: StopSignal,
}

impl QueueContext {
    /// Report an error that should be logged without ending the handler
    pub async fn report(&self, error: ServiceError) {
        if let Err(mpsc::error::SendError(error)) = self.errors.send(error).await {
            error!("Error from consumer queue after shutdown: {}", error);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Completes once the queue component is being closed
    pub async fn stopped(&self) {
        self.stop.wait().await;
    }
}

pub type QueueHandler = Arc<dyn Fn(QueueContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

type CloseFn = Arc<dyn Fn(ShutdownScope) -> BoxFuture<'static, Result<()>> + Send + Sync>;

pub fn handler<F, Fut>(f: F) -> QueueHandler
where
    F: Fn(QueueContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: QueueContext| f(ctx).boxed())
}

/// Consumer loops: every handler runs concurrently and the first one to
/// return ends `run` with its result.
pub struct QueueComponent {
    handlers: Vec<QueueHandler>,
    close: Option<CloseFn>,
    stop: StopSignal,
}

impl QueueComponent {
    pub fn new(handlers: Vec<QueueHandler>) -> Self {
        Self {
            handlers,
            close: None,
            stop: StopSignal::new(),
        }
    }

    /// Extra teardown run after the handlers have been told to stop
    pub fn with_close<F, Fut>(mut self, close: F) -> Self
    where
        F: Fn(ShutdownScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.close = Some(Arc::new(move |scope: ShutdownScope| close(scope).boxed()));
        self
    }
}

#[async_trait]
impl Component for QueueComponent {
    fn name(&self) -> &str {
        "queue"
    }

    async fn run(&self) -> Result<()> {
        info!(
            "Starting queue component with {} handlers",
            self.handlers.len()
        );

        if self.handlers.is_empty() {
            self.stop.wait().await;
            return Ok(());
        }

        let (errors_tx, mut errors_rx) = mpsc::channel(HANDLER_ERROR_BUFFER);
        let mut tasks = JoinSet::new();
        for handler in &self.handlers {
            let ctx = QueueContext {
                errors: errors_tx.clone(),
                stop: self.stop.clone(),
            };
            tasks.spawn(handler(ctx));
        }
        drop(errors_tx);

        loop {
            tokio::select! {
                Some(err) = errors_rx.recv() => {
                    error!("Error from consumer queue: {}", err);
                }
                Some(joined) = tasks.join_next() => {
                    return joined.map_err(|e| ServiceError::Panicked {
                        component: "queue".to_string(),
                        message: e.to_string(),
                    })?;
                }
            }
        }
    }

    async fn close(&self, scope: &ShutdownScope) -> Result<()> {
        self.stop.stop();

        match &self.close {
            Some(close) => close(scope.clone()).await,
            None => Ok(()),
        }
    }
}
