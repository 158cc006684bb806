use core::time::Duration;

/// Represents the result of a single attempt to generate a new id.
///
/// This type models the outcome of [`FastId::poll_id`]:
///
/// - [`IdGenStatus::Ready`] indicates a new id was successfully issued.
/// - [`IdGenStatus::Pending`] means no id was issued on this attempt, either
///   because the sequence space of the current tick is exhausted or because
///   another caller won the compare-and-swap race.
///
/// This allows non-blocking generation loops with any backoff strategy; see
/// [`FastId::next_id`] and [`FastId::next_id_async`] for the provided ones.
///
/// [`FastId::poll_id`]: crate::FastId::poll_id
/// [`FastId::next_id`]: crate::FastId::next_id
/// [`FastId::next_id_async`]: crate::FastId::next_id_async
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique id was generated and is ready to use.
    Ready {
        /// The generated id.
        id: i64,
    },
    /// No id could be generated on this attempt.
    Pending {
        /// How long to wait before trying again. Zero means the attempt lost a
        /// compare-and-swap race and may be retried right away.
        yield_for: Duration,
    },
}
