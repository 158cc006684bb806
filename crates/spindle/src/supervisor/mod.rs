mod exit;
mod handler;
mod registry;
mod runner;
mod supervise;
mod trace;

pub use exit::exit_now;
pub use handler::{PanicHandler, PanicPayload, log_panic, panic_message};
pub use runner::*;
pub use supervise::*;
pub use trace::{PanicTrace, panic_trace};
pub use tokio_util::sync::CancellationToken;
