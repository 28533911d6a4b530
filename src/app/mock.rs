use super::Logger;
use crate::component::{Component, ShutdownScope, StopSignal};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub(super) type Journal = Arc<Mutex<Vec<String>>>;

pub(super) fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub(super) fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

pub(super) fn count(journal: &Journal, entry: &str) -> usize {
    journal.lock().iter().filter(|e| e.as_str() == entry).count()
}

#[derive(Debug, Clone, Copy)]
pub(super) enum RunBehavior {
    ReturnOk,
    ReturnErr(&'static str),
    UntilClosed,
    Panic,
}

#[derive(Debug, Clone, Copy)]
pub(super) enum CloseBehavior {
    Ok,
    Err(&'static str),
    /// Ignores the scope and sleeps far past any test timeout.
    Hang,
    /// Waits for the scope to expire, then records that it noticed.
    UntilScopeExpired,
}

/// Scripted component that records every call into a shared journal
pub(super) struct MockComponent {
    name: String,
    journal: Journal,
    startup_error: Option<&'static str>,
    run: RunBehavior,
    close: CloseBehavior,
    stop: StopSignal,
}

impl MockComponent {
    pub(super) fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            startup_error: None,
            run: RunBehavior::UntilClosed,
            close: CloseBehavior::Ok,
            stop: StopSignal::new(),
        }
    }

    pub(super) fn failing_startup(mut self, message: &'static str) -> Self {
        self.startup_error = Some(message);
        self
    }

    pub(super) fn run(mut self, run: RunBehavior) -> Self {
        self.run = run;
        self
    }

    pub(super) fn close(mut self, close: CloseBehavior) -> Self {
        self.close = close;
        self
    }

    fn record(&self, call: &str) {
        self.journal.lock().push(format!("{}:{}", self.name, call));
    }
}

#[async_trait]
impl Component for MockComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn startup(&self) -> Result<()> {
        self.record("startup");
        match self.startup_error {
            Some(message) => Err(ServiceError::component(self.name.as_str(), message)),
            None => Ok(()),
        }
    }

    async fn run(&self) -> Result<()> {
        self.record("run");
        match self.run {
            RunBehavior::ReturnOk => Ok(()),
            RunBehavior::ReturnErr(message) => {
                Err(ServiceError::component(self.name.as_str(), message))
            }
            RunBehavior::UntilClosed => {
                self.stop.wait().await;
                Ok(())
            }
            RunBehavior::Panic => panic!("{} blew up", self.name),
        }
    }

    async fn close(&self, scope: &ShutdownScope) -> Result<()> {
        self.record("close");
        self.stop.stop();
        match self.close {
            CloseBehavior::Ok => Ok(()),
            CloseBehavior::Err(message) => {
                Err(ServiceError::component(self.name.as_str(), message))
            }
            CloseBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
            CloseBehavior::UntilScopeExpired => {
                scope.expired().await;
                self.record("close-cancelled");
                Ok(())
            }
        }
    }
}

/// Logger that keeps every line for inspection
#[derive(Default)]
pub(super) struct RecordingLogger {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    pub(super) fn lines(&self) -> Vec<(&'static str, String)> {
        self.lines.lock().clone()
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.lines.lock().push(("debug", message.to_string()));
    }

    fn info(&self, message: &str) {
        self.lines.lock().push(("info", message.to_string()));
    }
}
