//! Error types for `spindle`.
//!
//! Runtime paths are infallible: supervised failures are routed to the panic
//! handler and [`FastId::next_id`] never errors. Errors only surface while
//! constructing a generator from an invalid configuration.
//!
//! [`FastId::next_id`]: crate::FastId::next_id

use core::time::Duration;

/// Result alias used across the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `spindle` can emit.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The bit layout does not fit in the 63 value bits of an `i64`, or leaves
    /// no room for the timestamp.
    #[error(
        "invalid id layout: time_bits={time_bits} step_bits={step_bits} node_bits={node_bits} \
         (need time_bits >= 1 and a total of at most 63)"
    )]
    InvalidLayout {
        time_bits: u8,
        step_bits: u8,
        node_bits: u8,
    },

    /// The configured epoch lies after the current time of the clock.
    #[error("epoch {epoch:?} is after the current clock time {now:?}")]
    EpochAfterNow { epoch: Duration, now: Duration },
}
