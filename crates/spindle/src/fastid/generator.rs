use core::{fmt, time::Duration};

use portable_atomic::{AtomicI64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, FastIdConfig, IdGenStatus, Layout, MonotonicClock, Result, TICK_NANOS_MASK, TICK_SHIFT,
    TimeSource, local_node_id, time::saturating_nanos,
};

/// Pause taken after losing a compare-and-swap race.
const CAS_BACKOFF: Duration = Duration::from_nanos(20);

/// A lock-free generator of unique, time-ordered 64-bit identifiers.
///
/// The whole generator state is the most recently issued id (seeded from the
/// clock at construction), stored in a single atomic word. Every new id is derived from it and published with a
/// compare-and-swap, so concurrent callers never block each other: the loser
/// of a race simply retries.
///
/// ## Guarantees
/// - Ids issued by one instance are pairwise distinct.
/// - Ids are non-decreasing in the order their compare-and-swap succeeds.
/// - Within a tick that does not advance, the sequence keeps incrementing.
///   Once the sequence space of a tick is exhausted, callers back off until
///   the next tick boundary.
/// - If the clock moves backwards, ids keep using the last issued tick and
///   its sequence; when that sequence is exhausted the generator waits for
///   the clock to catch up rather than reuse an id.
/// - The time field wraps after `2^time_bits` ticks. A wrap counts as the
///   clock moving forward, so generation continues; ids from before and
///   after a wrap are only unique within one wrap period.
///
/// There is no ordering across instances; distinct instances are told apart
/// by their node id.
///
/// ## Example
/// ```
/// use spindle::{FastId, FastIdConfig};
///
/// let generator = FastId::new(FastIdConfig::default().with_node_id(1)).unwrap();
/// let id = generator.next_id();
/// assert_eq!(generator.get_node(id), 1);
/// assert_eq!(generator.get_sequence(id), 0);
/// ```
pub struct FastId<T = MonotonicClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicI64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicI64,
    layout: Layout,
    epoch_nanos: i64,
    node_id: i64,
    clock: T,
}

impl FastId<MonotonicClock> {
    /// Creates a generator driven by a fresh [`MonotonicClock`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLayout`] if the bit widths do not fit in 63 bits.
    /// - [`Error::EpochAfterNow`] if the epoch lies in the future.
    pub fn new(config: FastIdConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<T> FastId<T>
where
    T: TimeSource,
{
    /// Creates a generator reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`FastId::new`].
    pub fn with_clock(config: FastIdConfig, clock: T) -> Result<Self> {
        let layout = config.layout()?;
        let epoch_nanos = saturating_nanos(config.epoch);
        let now = clock.now_nanos();
        if now < epoch_nanos {
            return Err(Error::EpochAfterNow {
                epoch: config.epoch,
                now: Duration::from_nanos(u64::try_from(now).unwrap_or(0)),
            });
        }

        let node_id = config.node_id.unwrap_or_else(local_node_id) & layout.node_mask();
        // Seed the state as if the tick before `now` had been used up, so the
        // first id lands on the current tick wherever it sits in the field.
        let (_, tick) = current_tick(layout, epoch_nanos, now);
        let seed = layout.compose(tick.wrapping_sub(1), layout.step_mask(), node_id);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            time_bits = layout.time_bits(),
            step_bits = layout.step_bits(),
            node_bits = layout.node_bits(),
            node_id,
            "Created id generator"
        );

        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicI64::new(seed)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicI64::new(seed),
            layout,
            epoch_nanos,
            node_id,
            clock,
        })
    }

    pub const fn layout(&self) -> Layout {
        self.layout
    }

    pub const fn node_id(&self) -> i64 {
        self.node_id
    }

    /// Returns the timestamp tick embedded in `id`.
    pub const fn get_time(&self, id: i64) -> i64 {
        self.layout.time(id)
    }

    /// Returns the per-tick sequence embedded in `id`.
    pub const fn get_sequence(&self, id: i64) -> i64 {
        self.layout.sequence(id)
    }

    /// Returns the node id embedded in `id`.
    pub const fn get_node(&self, id: i64) -> i64 {
        self.layout.node(id)
    }

    /// Returns a new id, blocking the current thread while the sequence space
    /// of the current tick is exhausted.
    ///
    /// Never fails. Under sustained load that exhausts the sequence every tick
    /// this call keeps sleeping; that is a capacity problem (too few sequence
    /// bits), not an error.
    pub fn next_id(&self) -> i64 {
        loop {
            match self.poll_id() {
                IdGenStatus::Ready { id } => return id,
                IdGenStatus::Pending { yield_for } if yield_for.is_zero() => {
                    std::thread::sleep(CAS_BACKOFF);
                }
                IdGenStatus::Pending { yield_for } => std::thread::sleep(yield_for),
            }
        }
    }

    /// Async counterpart of [`Self::next_id`] that sleeps on the tokio timer
    /// instead of blocking the worker thread.
    pub async fn next_id_async(&self) -> i64 {
        loop {
            match self.poll_id() {
                IdGenStatus::Ready { id } => return id,
                IdGenStatus::Pending { yield_for } if yield_for.is_zero() => {
                    tokio::task::yield_now().await;
                }
                IdGenStatus::Pending { yield_for } => tokio::time::sleep(yield_for).await,
            }
        }
    }

    /// Makes a single attempt at issuing an id.
    ///
    /// # Returns
    /// - `IdGenStatus::Ready { id }`: the id was published
    /// - `IdGenStatus::Pending { yield_for }`: the sequence is exhausted
    ///   (`yield_for` is the time left in the current tick) or the
    ///   compare-and-swap lost a race (`yield_for` is zero)
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> IdGenStatus {
        let last_id = self.state.load(Ordering::Acquire);
        let last_tick = self.layout.time(last_id);
        let last_seq = self.layout.sequence(last_id);

        let (elapsed, now) = current_tick(self.layout, self.epoch_nanos, self.clock.now_nanos());

        let (tick, seq) = if self.layout.tick_after(now, last_tick) {
            (now, 0)
        } else if last_seq >= self.layout.step_mask() {
            return Self::cold_exhausted(elapsed);
        } else {
            // `now` may trail `last_tick` after a clock regression; stay on the
            // last tick so ids never decrease.
            (last_tick, last_seq + 1)
        };

        let next_id = self.layout.compose(tick, seq, self.node_id);
        if self
            .state
            .compare_exchange(last_id, next_id, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            IdGenStatus::Ready { id: next_id }
        } else {
            IdGenStatus::Pending {
                yield_for: Duration::ZERO,
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_exhausted(elapsed: i64) -> IdGenStatus {
        let remaining = TICK_NANOS_MASK - (elapsed & TICK_NANOS_MASK);
        IdGenStatus::Pending {
            yield_for: Duration::from_nanos(remaining as u64),
        }
    }
}

/// Nanoseconds since `epoch_nanos` (clamped at zero) and the tick they fall in.
fn current_tick(layout: Layout, epoch_nanos: i64, now_nanos: i64) -> (i64, i64) {
    let elapsed = now_nanos.saturating_sub(epoch_nanos).max(0);
    (elapsed, (elapsed >> TICK_SHIFT) & layout.time_mask())
}

impl<T> fmt::Debug for FastId<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastId")
            .field("layout", &self.layout)
            .field("epoch_nanos", &self.epoch_nanos)
            .field("node_id", &self.node_id)
            .field("last_id", &self.state.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
