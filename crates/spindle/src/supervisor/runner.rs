use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// A wait-group for a set of futures sharing one stop signal.
///
/// Unlike [`Supervisor`], a runner does not label, contain or report its
/// tasks: a panicking task surfaces through its own [`JoinHandle`]. Use it
/// for a fixed group of cooperating loops that should all stop together.
///
/// ```
/// use spindle::Runner;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runner = Runner::new();
/// let stop = runner.stop_token();
/// runner.run(async move { stop.cancelled().await });
///
/// runner.end().await;
/// assert!(runner.is_empty());
/// # }
/// ```
///
/// [`Supervisor`]: crate::Supervisor
#[derive(Clone, Debug, Default)]
pub struct Runner {
    tracker: TaskTracker,
    stop: CancellationToken,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` on the current tokio runtime and tracks it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn run<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// The stop signal shared by every task of this runner.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Resolves once [`Self::end`] has been called.
    pub async fn stopped(&self) {
        self.stop.cancelled().await;
    }

    /// Number of tracked tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits for every tracked task to finish without signalling stop. The
    /// runner accepts new tasks afterwards.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Signals stop and waits for every tracked task to finish.
    pub async fn end(&self) {
        self.stop.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
