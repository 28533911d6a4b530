use super::shutdown::SweepMode;
use super::signals::ShutdownSignals;
use super::{LifecycleState, Orchestrator, ShutdownReason};
use crate::component::Component;
use crate::error::{Result, ServiceError};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A component's run returned
struct RunExit {
    component: String,
    result: Result<()>,
}

enum Trigger {
    Exit(RunExit),
    Signal(String),
}

impl Orchestrator {
    /// Start, run and shut down every component, shutting down on the first
    /// component exit or on a process termination signal.
    ///
    /// Returns exactly one terminal result: the exiting component's own
    /// result, a close failure, [`ServiceError::ShutdownTimeout`], or the
    /// wrapped startup failure.
    pub async fn launch(&self) -> Result<()> {
        self.claim_launch()?;

        let mut signals = match ShutdownSignals::register() {
            Ok(signals) => signals,
            Err(e) => {
                self.set_state(LifecycleState::Terminated);
                return Err(ServiceError::Signal(e));
            }
        };

        self.drive(async move { signals.recv().await.to_string() })
            .await
    }

    /// Like [`Orchestrator::launch`], with `shutdown` standing in for the
    /// process signals. Its output names the trigger in logs.
    pub async fn launch_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = String> + Send,
    {
        self.claim_launch()?;
        self.drive(shutdown).await
    }

    fn claim_launch(&self) -> Result<()> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Idle {
                *state = LifecycleState::Starting;
                true
            } else {
                false
            }
        });

        if claimed {
            Ok(())
        } else {
            Err(ServiceError::AlreadyLaunched)
        }
    }

    async fn drive<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = String> + Send,
    {
        let result = self.supervise(shutdown).await;
        self.set_state(LifecycleState::Terminated);
        result
    }

    async fn supervise<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = String> + Send,
    {
        self.start_all().await?;

        let (mut completions, runs) = self.spawn_runs();
        self.set_state(LifecycleState::Running);
        self.logger.info(&format!(
            "All {} component(s) started",
            self.components.len()
        ));

        let trigger = tokio::select! {
            Some(exit) = completions.recv() => Trigger::Exit(exit),
            signal = shutdown => Trigger::Signal(signal),
        };

        self.set_state(LifecycleState::ShuttingDown);

        let result = match trigger {
            Trigger::Exit(exit) => {
                let reason = ShutdownReason::ComponentExited {
                    component: exit.component,
                    failed: exit.result.is_err(),
                };
                self.logger.info(&format!("Shutdown initiated: {}", reason));
                if let Err(e) = &exit.result {
                    self.logger.info(&format!("Application error: {}", e));
                }

                let swept = self
                    .sweep(self.components.clone(), SweepMode::FailFast)
                    .await;
                swept.and(exit.result)
            }
            Trigger::Signal(signal) => {
                let reason = ShutdownReason::Signal(signal);
                self.logger
                    .info(&format!("{}: shutting down gracefully", reason));

                self.sweep(self.components.clone(), SweepMode::BestEffort)
                    .await
            }
        };

        if matches!(result, Err(ServiceError::ShutdownTimeout { .. })) {
            abort_unfinished(&runs, self.logger.as_ref());
        }

        result
    }

    /// Spawn one run task per component.
    ///
    /// The completion channel holds one slot per component so a run that
    /// finishes after the first never blocks on reporting.
    fn spawn_runs(&self) -> (mpsc::Receiver<RunExit>, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(self.components.len().max(1));

        let runs = self
            .components
            .iter()
            .map(|component| {
                let component: Arc<dyn Component> = Arc::clone(component);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = AssertUnwindSafe(component.run())
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            Err(ServiceError::Panicked {
                                component: component.name().to_string(),
                                message: panic_message(panic.as_ref()),
                            })
                        });

                    let _ = tx
                        .send(RunExit {
                            component: component.name().to_string(),
                            result,
                        })
                        .await;
                })
            })
            .collect();

        (rx, runs)
    }
}

fn abort_unfinished(runs: &[JoinHandle<()>], logger: &dyn super::Logger) {
    let mut aborted = 0;
    for run in runs.iter().filter(|run| !run.is_finished()) {
        run.abort();
        aborted += 1;
    }
    if aborted > 0 {
        logger.info(&format!(
            "Aborted {} component run(s) still active after the deadline",
            aborted
        ));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
