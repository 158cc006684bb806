//! Panic-site capture for supervised units.
//!
//! `catch_unwind` only sees the payload once the stack is gone. A chained
//! panic hook therefore records the location and a backtrace while the unit is
//! still unwinding from the panic site, into a slot local to the supervised
//! task. The panic handler runs on that same task afterwards and reads it back
//! through [`panic_trace`].

use std::{backtrace::Backtrace, cell::RefCell, future::Future, sync::Once};

/// Where a supervised unit panicked.
#[derive(Debug)]
pub struct PanicTrace {
    /// `file:line:column` of the panic, if the runtime reported one.
    pub location: Option<String>,
    /// Stack captured in the panic hook, before unwinding.
    pub backtrace: Backtrace,
}

tokio::task_local! {
    static PANIC_TRACE: RefCell<Option<PanicTrace>>;
}

static HOOK: Once = Once::new();

/// Chains the recording hook in front of whatever hook is installed now.
/// Panics outside a supervised task only go through the previous hook.
pub(crate) fn install_trace_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = PANIC_TRACE.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(PanicTrace {
                        location: info.location().map(ToString::to_string),
                        backtrace: Backtrace::force_capture(),
                    });
                }
            });
            previous(info);
        }));
    });
}

/// Gives `future` an empty trace slot.
pub(crate) fn scope<F: Future>(future: F) -> impl Future<Output = F::Output> {
    PANIC_TRACE.scope(RefCell::new(None), future)
}

/// Runs `f` on the trace of the panic being reported.
///
/// Meant to be called from a [`PanicHandler`]. Returns `None` anywhere else,
/// and inside a handler when the panic did not pass through the hook (for
/// example when another hook was installed before any [`Supervisor`] was
/// created and later replaced without chaining).
///
/// [`PanicHandler`]: crate::PanicHandler
/// [`Supervisor`]: crate::Supervisor
pub fn panic_trace<R>(f: impl FnOnce(&PanicTrace) -> R) -> Option<R> {
    PANIC_TRACE
        .try_with(|slot| {
            let slot = slot.try_borrow().ok()?;
            slot.as_ref().map(f)
        })
        .ok()
        .flatten()
}
