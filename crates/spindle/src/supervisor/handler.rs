use std::{any::Any, sync::Arc};

use crate::panic_trace;

/// The payload a panicking task unwound with.
pub type PanicPayload = dyn Any + Send + 'static;

/// Callback invoked with the payload and the call-site label of a supervised
/// task that panicked.
pub type PanicHandler = Arc<dyn Fn(&PanicPayload, &str) + Send + Sync + 'static>;

/// Extracts the message of a panic payload.
///
/// `panic!` payloads are either a `&'static str` or a formatted `String`;
/// anything else is reported as an opaque payload.
pub fn panic_message(payload: &PanicPayload) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// The default [`PanicHandler`]: logs the panic message, the panic location
/// and a backtrace taken at the panic site, at `error` level.
pub fn log_panic(payload: &PanicPayload, site: &str) {
    let message = panic_message(payload);
    let reported = panic_trace(|trace| {
        let location = trace.location.as_deref().unwrap_or("<unknown>");
        let backtrace = &trace.backtrace;
        #[cfg(feature = "tracing")]
        tracing::error!(
            site,
            panic = %message,
            location,
            "Supervised task panicked\n{backtrace}"
        );
        #[cfg(not(feature = "tracing"))]
        eprintln!("supervised task {site} panicked at {location}: {message}\n{backtrace}");
    });

    if reported.is_none() {
        #[cfg(feature = "tracing")]
        tracing::error!(site, panic = %message, "Supervised task panicked");
        #[cfg(not(feature = "tracing"))]
        eprintln!("supervised task {site} panicked: {message}");
    }
}

pub(crate) fn default_handler() -> PanicHandler {
    Arc::new(log_panic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_string_payloads() {
        let payload: Box<PanicPayload> = Box::new("static");
        assert_eq!(panic_message(&*payload), "static");

        let payload: Box<PanicPayload> = Box::new(format!("formatted {}", 1));
        assert_eq!(panic_message(&*payload), "formatted 1");

        let payload: Box<PanicPayload> = Box::new(42_u32);
        assert_eq!(panic_message(&*payload), "<non-string panic payload>");
    }
}
