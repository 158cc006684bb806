//! Live-unit bookkeeping keyed by call site.
//!
//! Every spawn enters the registry before the task exists and every exit
//! leaves it from a drop guard, so the counts cover panics and aborted tasks
//! too. All mutations happen under one short-held lock; waiters are woken
//! whenever the total reaches zero.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct LiveState {
    sites: HashMap<String, usize>,
    total: usize,
}

#[derive(Debug, Default)]
pub(crate) struct LiveRegistry {
    state: Mutex<LiveState>,
    drained: Notify,
}

impl LiveRegistry {
    /// Counts one more live unit for `site`.
    pub(crate) fn enter(self: &Arc<Self>, site: &str) -> LiveGuard {
        let mut state = self.state.lock();
        *state.sites.entry(site.to_owned()).or_default() += 1;
        state.total += 1;
        drop(state);

        LiveGuard {
            registry: Arc::clone(self),
            site: site.to_owned(),
        }
    }

    fn leave(&self, site: &str) {
        let mut state = self.state.lock();
        if let Some(count) = state.sites.get_mut(site) {
            *count -= 1;
            if *count == 0 {
                state.sites.remove(site);
            }
        }
        state.total -= 1;
        let drained = state.total == 0;
        drop(state);

        if drained {
            self.drained.notify_waiters();
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.state.lock().total
    }

    /// Sites with live units, sorted by site.
    pub(crate) fn snapshot(&self) -> Vec<(String, usize)> {
        let mut sites: Vec<_> = self
            .state
            .lock()
            .sites
            .iter()
            .map(|(site, count)| (site.clone(), *count))
            .collect();
        sites.sort_unstable();
        sites
    }

    /// Resolves once the total drops to zero. Register (and `enable`) the
    /// future before checking [`Self::total`] so no wake-up is lost.
    pub(crate) fn drained(&self) -> tokio::sync::futures::Notified<'_> {
        self.drained.notified()
    }
}

/// Releases one live unit when dropped.
#[derive(Debug)]
pub(crate) struct LiveGuard {
    registry: Arc<LiveRegistry>,
    site: String,
}

impl LiveGuard {
    pub(crate) fn site(&self) -> &str {
        &self.site
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.registry.leave(&self.site);
    }
}
