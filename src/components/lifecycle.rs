use crate::component::{Component, ShutdownScope, StopSignal};
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

type HookFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;
type RunFn = Arc<dyn Fn(StopSignal) -> BoxFuture<'static, Result<()>> + Send + Sync>;
type CleanupFn = Arc<dyn Fn(ShutdownScope) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A component assembled from closures.
///
/// Startup hooks run in order and stop at the first error, as do cleanup
/// hooks. Without a run function, `run` blocks until the component is closed.
pub struct LifecycleComponent {
    name: String,
    startups: Vec<HookFn>,
    run: Option<RunFn>,
    cleanups: Vec<CleanupFn>,
    stop: StopSignal,
}

impl LifecycleComponent {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            startups: Vec::new(),
            run: None,
            cleanups: Vec::new(),
            stop: StopSignal::new(),
        }
    }

    pub fn on_startup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.startups.push(Arc::new(move || hook().boxed()));
        self
    }

    /// The run function receives a signal that fires when close begins.
    pub fn on_run<F, Fut>(mut self, run: F) -> Self
    where
        F: Fn(StopSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.run = Some(Arc::new(move |stop: StopSignal| run(stop).boxed()));
        self
    }

    pub fn on_close<F, Fut>(mut self, cleanup: F) -> Self
    where
        F: Fn(ShutdownScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.cleanups
            .push(Arc::new(move |scope: ShutdownScope| cleanup(scope).boxed()));
        self
    }
}

#[async_trait]
impl Component for LifecycleComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn startup(&self) -> Result<()> {
        for hook in &self.startups {
            hook().await?;
        }
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        match &self.run {
            Some(run) => run(self.stop.clone()).await,
            None => {
                self.stop.wait().await;
                Ok(())
            }
        }
    }

    async fn close(&self, scope: &ShutdownScope) -> Result<()> {
        self.stop.stop();

        for cleanup in &self.cleanups {
            cleanup(scope.clone()).await?;
        }
        Ok(())
    }
}
