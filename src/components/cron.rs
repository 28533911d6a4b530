use crate::component::{Component, ShutdownScope, StopSignal};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A job fired on a fixed interval
#[derive(Clone)]
pub struct ScheduledJob {
    name: String,
    every: Duration,
    job: JobFn,
}

impl ScheduledJob {
    pub fn new<N, F, Fut>(name: N, every: Duration, job: F) -> Self
    where
        N: Into<String>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            every,
            job: Arc::new(move || job().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn every(&self) -> Duration {
        self.every
    }
}

/// Runs every registered job on its own ticker until closed.
///
/// A failing or panicking job is logged and retried on its next tick; it
/// never ends `run`.
pub struct CronComponent {
    jobs: Vec<ScheduledJob>,
    stop: StopSignal,
    stopped: StopSignal,
    running: AtomicBool,
}

impl CronComponent {
    pub fn new(jobs: Vec<ScheduledJob>) -> Self {
        Self {
            jobs,
            stop: StopSignal::new(),
            stopped: StopSignal::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }
}

async fn tick_loop(job: ScheduledJob, stop: StopSignal) {
    let mut interval = tokio::time::interval(job.every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; jobs fire one period after start.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = stop.wait() => break,
            _ = interval.tick() => {
                debug!("Running scheduled job {}", job.name);
                match AssertUnwindSafe((job.job)()).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Scheduled job {} failed: {}", job.name, e),
                    Err(_) => warn!("Scheduled job {} panicked", job.name),
                }
            }
        }
    }
}

#[async_trait]
impl Component for CronComponent {
    fn name(&self) -> &str {
        "cron"
    }

    async fn startup(&self) -> Result<()> {
        if let Some(job) = self.jobs.iter().find(|job| job.every.is_zero()) {
            return Err(ServiceError::component(
                "cron",
                format!("job {} has a zero interval", job.name),
            ));
        }
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!("Starting cron component with {} job(s)", self.jobs.len());

        let mut tasks = JoinSet::new();
        for job in &self.jobs {
            tasks.spawn(tick_loop(job.clone(), self.stop.clone()));
        }

        if tasks.is_empty() {
            self.stop.wait().await;
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Scheduled job task ended abnormally: {}", e);
            }
        }

        self.stopped.stop();
        Ok(())
    }

    async fn close(&self, scope: &ShutdownScope) -> Result<()> {
        self.stop.stop();

        if self.running.load(Ordering::SeqCst) {
            scope.bound(self.stopped.wait()).await?;
        }
        Ok(())
    }
}
