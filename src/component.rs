//! The contract every subsystem implements to be hosted by the
//! [`Orchestrator`](crate::Orchestrator).
//!
//! A component goes through three calls:
//!
//! 1. [`Component::startup`] is awaited once, in registration order, before
//!    anything runs. Bind sockets and open connections here.
//! 2. [`Component::run`] is spawned concurrently with every other component's
//!    run. It blocks until the component's work ends. Any return, `Ok` or
//!    `Err`, ends the running phase of the whole process.
//! 3. [`Component::close`] is called once during the shutdown sweep. It must
//!    unblock the component's own `run` if that is still in flight and must not
//!    outlive the [`ShutdownScope`] it is handed.

use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Name used in logs and error values. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn startup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self) -> Result<()>;

    async fn close(&self, scope: &ShutdownScope) -> Result<()>;
}

/// Deadline-bound scope handed to [`Component::close`].
///
/// All closes of one sweep share a single scope, so a slow component eats into
/// the budget of the components after it. Once the deadline passes the scope
/// is cancelled, which wakes anything waiting in [`ShutdownScope::expired`].
#[derive(Debug, Clone)]
pub struct ShutdownScope {
    timeout: Duration,
    deadline: Instant,
    token: CancellationToken,
}

impl ShutdownScope {
    /// Timeouts too large to represent as an instant are clamped to roughly
    /// thirty years from now.
    pub fn new(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or_else(|| far_future(now));

        Self {
            timeout,
            deadline,
            token: CancellationToken::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        if self.token.is_cancelled() {
            return Duration::ZERO;
        }
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Completes when the deadline passes or the scope is cancelled.
    pub async fn expired(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// Runs `fut` to completion unless the scope expires first.
    pub async fn bound<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            out = fut => Ok(out),
            _ = self.expired() => Err(ServiceError::ShutdownTimeout { timeout: self.timeout }),
        }
    }

    pub(crate) fn expire(&self) {
        self.token.cancel();
    }
}

fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86400 * 365 * 30)
}

/// Latch for components whose `run` has nothing to do but wait to be closed.
///
/// ```
/// # use nextservice::StopSignal;
/// # async fn demo() {
/// let stop = StopSignal::new();
/// let waiter = stop.clone();
/// tokio::spawn(async move { waiter.wait().await });
/// stop.stop();
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Token handed to code that only understands cancellation tokens.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
