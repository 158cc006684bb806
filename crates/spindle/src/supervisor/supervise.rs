//! # Supervisor - tracked, cancellable task spawning.
//!
//! ```text
//! start(unit) ──► registry.enter(site) ──► tokio::spawn
//!                                              │
//!                                              ├─► unit(token).await
//!                                              │     ├─ returns         ─┐
//!                                              │     ├─ exit_now()      ─┤ (handler skipped)
//!                                              │     └─ panics ─► handler(payload, site)
//!                                              └─► guard dropped ─► registry.leave(site)
//!
//! cancel_and_wait(wait) ──► token.cancel()
//!                       └─► loop until registry empty or wait cancelled
//!                              (woken on drain, re-checked every 100 ms)
//! ```
//!
//! ## Rules
//! - The live count is raised before the task exists, so a concurrent
//!   `cancel_and_wait` always sees it.
//! - Nothing a unit does escapes to the spawner or to sibling units.
//! - Cancellation is cooperative: units must observe the token.

use std::{
    future::Future,
    panic::{AssertUnwindSafe, Location},
    pin::pin,
    sync::Arc,
    time::Duration,
};

use futures::FutureExt;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    PanicHandler, PanicPayload,
    supervisor::{
        exit::is_exit,
        handler::default_handler,
        registry::LiveRegistry,
        trace::{self, install_trace_hook},
    },
};

/// How often a draining supervisor re-checks (and logs) live units.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Inner {
    token: CancellationToken,
    registry: Arc<LiveRegistry>,
    panic_handler: RwLock<PanicHandler>,
}

/// Spawns tracked units of async work and shuts them down together.
///
/// Every unit receives a clone of one shared [`CancellationToken`]. Panics are
/// caught at the task boundary and routed to the panic handler; they never
/// reach the spawner or other units. [`Supervisor::cancel_and_wait`] signals
/// the token and waits for every unit to exit.
///
/// There is no global instance. The hosting program owns its supervisor(s)
/// and must call one of the `cancel*` methods before exiting if running units
/// should be drained. Cloning is cheap and yields a handle to the same
/// supervisor.
///
/// # Example
///
/// ```
/// use spindle::Supervisor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let supervisor = Supervisor::new();
/// supervisor.start(|token| async move {
///     token.cancelled().await;
/// });
///
/// supervisor.cancel_and_wait_forever().await;
/// assert_eq!(supervisor.live_count(), 0);
/// # }
/// ```
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    /// Creates a supervisor whose panic handler is [`log_panic`].
    ///
    /// The first supervisor created in a process chains a panic hook that
    /// records where a supervised unit panicked; see [`panic_trace`].
    ///
    /// [`log_panic`]: crate::log_panic
    /// [`panic_trace`]: crate::panic_trace
    pub fn new() -> Self {
        install_trace_hook();
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                registry: Arc::default(),
                panic_handler: RwLock::new(default_handler()),
            }),
        }
    }

    /// Builder-style variant of [`Self::set_panic_handler`].
    #[must_use]
    pub fn with_panic_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&PanicPayload, &str) + Send + Sync + 'static,
    {
        self.set_panic_handler(handler);
        self
    }

    /// Replaces the callback invoked when a unit panics. Units that panic
    /// afterwards use the new handler.
    pub fn set_panic_handler<F>(&self, handler: F)
    where
        F: Fn(&PanicPayload, &str) + Send + Sync + 'static,
    {
        *self.inner.panic_handler.write() = Arc::new(handler);
    }

    /// Starts `unit` on the current tokio runtime, labelled with the caller's
    /// source location (`file:line`).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[track_caller]
    pub fn start<F, Fut>(&self, unit: F) -> JoinHandle<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let caller = Location::caller();
        self.start_named(format!("{}:{}", caller.file(), caller.line()), unit)
    }

    /// Starts `unit` on the current tokio runtime under an explicit call-site
    /// label.
    ///
    /// The returned handle may be awaited or aborted; either way the live
    /// count is released when the task ends.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start_named<F, Fut>(&self, site: impl Into<String>, unit: F) -> JoinHandle<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let site: String = site.into();
        let guard = self.inner.registry.enter(&site);
        let token = self.inner.token.clone();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(trace::scope(async move {
            let outcome = AssertUnwindSafe(async move { unit(token).await })
                .catch_unwind()
                .await;
            if let Err(payload) = outcome {
                inner.report_panic(&*payload, guard.site());
            }
            drop(guard);
        }))
    }

    /// Signals cancellation to every unit, past and future, without waiting.
    ///
    /// Idempotent: only the first call has an effect.
    pub fn cancel(&self) {
        #[cfg(feature = "tracing")]
        if !self.inner.token.is_cancelled() {
            tracing::debug!(live = self.live_count(), "Cancelling supervised tasks");
        }
        self.inner.token.cancel();
    }

    /// Cancels, then waits until no unit is running or `wait` is cancelled.
    ///
    /// Returns `()` in both cases; check `wait.is_cancelled()` to tell them
    /// apart. While waiting, the remaining units are logged per call site
    /// every [`DRAIN_POLL_INTERVAL`].
    pub async fn cancel_and_wait(&self, wait: &CancellationToken) {
        self.cancel();
        loop {
            let mut drained = pin!(self.inner.registry.drained());
            drained.as_mut().enable();

            if self.is_quiescent_logged() {
                #[cfg(feature = "tracing")]
                tracing::debug!(live = 0, "All supervised tasks exited");
                return;
            }

            tokio::select! {
                () = wait.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        live = self.live_count(),
                        "Stopped waiting for supervised tasks"
                    );
                    return;
                }
                () = drained.as_mut() => {}
                () = tokio::time::sleep(DRAIN_POLL_INTERVAL) => {}
            }
        }
    }

    /// Cancels, then waits without bound until no unit is running.
    pub async fn cancel_and_wait_forever(&self) {
        self.cancel_and_wait(&CancellationToken::new()).await;
    }

    /// Cancels, then waits up to `timeout` for every unit to exit. Returns
    /// `true` if they all did.
    pub async fn cancel_and_wait_timeout(&self, timeout: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel_and_wait_forever() => true,
            () = tokio::time::sleep(timeout) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    live = self.live_count(),
                    "Timed out after {timeout:?} waiting for supervised tasks"
                );
                false
            }
        }
    }

    /// Returns whether [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns a clone of the token shared by every unit.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Total number of running units.
    pub fn live_count(&self) -> usize {
        self.inner.registry.total()
    }

    /// Running units per call site, sorted by site.
    pub fn live_units(&self) -> Vec<(String, usize)> {
        self.inner.registry.snapshot()
    }

    fn is_quiescent_logged(&self) -> bool {
        let live = self.inner.registry.snapshot();
        #[cfg(feature = "tracing")]
        for (site, count) in &live {
            tracing::info!(%site, count = *count, "Still waiting for supervised tasks to exit");
        }
        live.is_empty()
    }
}

impl Inner {
    fn report_panic(&self, payload: &PanicPayload, site: &str) {
        if is_exit(payload) {
            #[cfg(feature = "tracing")]
            tracing::trace!(site, "Supervised task exited early");
            return;
        }

        let handler = self.panic_handler.read().clone();
        if std::panic::catch_unwind(AssertUnwindSafe(|| handler(payload, site))).is_err() {
            #[cfg(feature = "tracing")]
            tracing::error!(
                site,
                panic = %crate::panic_message(payload),
                "Panic handler panicked while reporting a supervised task"
            );
            #[cfg(not(feature = "tracing"))]
            eprintln!("panic handler panicked while reporting supervised task at {site}");
        }
    }
}
