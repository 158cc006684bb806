use crate::PanicPayload;

/// Unwind payload marking a deliberate exit.
struct ExitNow;

/// Terminates the current supervised task without reporting a failure.
///
/// The task unwinds (running destructors on the way) but the panic handler is
/// not called and no panic hook output is produced. The supervisor still
/// releases the task's live count. Useful deep inside a call stack, e.g. when
/// a helper notices cancellation and wants the whole task to stop.
///
/// Calling this outside a task started by a [`Supervisor`] unwinds like an
/// ordinary panic.
///
/// [`Supervisor`]: crate::Supervisor
pub fn exit_now() -> ! {
    std::panic::resume_unwind(Box::new(ExitNow))
}

pub(crate) fn is_exit(payload: &PanicPayload) -> bool {
    payload.is::<ExitNow>()
}
