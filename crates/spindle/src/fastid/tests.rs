use crate::{
    Error, FastId, FastIdConfig, IdGenStatus, MonotonicClock, TICK_SHIFT, TimeSource,
    UNIX_EPOCH_START,
};
use core::time::Duration;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::scope;
use std::time::Instant;

struct FixedTime {
    nanos: i64,
}

impl TimeSource for FixedTime {
    fn now_nanos(&self) -> i64 {
        self.nanos
    }
}

/// A clock that only moves when a test tells it to.
#[derive(Clone, Default)]
struct StepTime {
    nanos: Arc<AtomicI64>,
}

impl StepTime {
    fn at_tick(tick: i64) -> Self {
        let clock = Self::default();
        clock.set_tick(tick);
        clock
    }

    fn set_tick(&self, tick: i64) {
        self.nanos.store(tick << TICK_SHIFT, Ordering::SeqCst);
    }
}

impl TimeSource for StepTime {
    fn now_nanos(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

trait IdGenStatusExt {
    fn unwrap_ready(self) -> i64;
    fn unwrap_pending(self) -> Duration;
}

impl IdGenStatusExt for IdGenStatus {
    fn unwrap_ready(self) -> i64 {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for:?})")
            }
        }
    }

    fn unwrap_pending(self) -> Duration {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn config(step_bits: u8) -> FastIdConfig {
    FastIdConfig::default()
        .with_bits(45, step_bits, 6)
        .with_epoch(UNIX_EPOCH_START)
        .with_node_id(1)
}

#[test]
fn sequence_increments_within_same_tick() {
    let generator = FastId::with_clock(config(12), FixedTime { nanos: 42 << TICK_SHIFT }).unwrap();

    let id1 = generator.next_id();
    let id2 = generator.next_id();
    let id3 = generator.next_id();

    for id in [id1, id2, id3] {
        assert_eq!(generator.get_time(id), 42);
        assert_eq!(generator.get_node(id), 1);
    }
    assert_eq!(generator.get_sequence(id1), 0);
    assert_eq!(generator.get_sequence(id2), 1);
    assert_eq!(generator.get_sequence(id3), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn pending_when_sequence_exhausted() {
    let nanos = (42 << TICK_SHIFT) + 1000;
    let generator = FastId::with_clock(config(2), FixedTime { nanos }).unwrap();

    for seq in 0..4 {
        let id = generator.poll_id().unwrap_ready();
        assert_eq!(generator.get_sequence(id), seq);
    }

    let yield_for = generator.poll_id().unwrap_pending();
    assert_eq!(yield_for, Duration::from_nanos(0xFFFFF - 1000));
}

#[test]
fn exhausted_tick_blocks_until_clock_advances() {
    let clock = StepTime::at_tick(42);
    let generator = FastId::with_clock(config(2), clock.clone()).unwrap();

    for seq in 0..4 {
        let id = generator.next_id();
        assert_eq!(generator.get_time(id), 42);
        assert_eq!(generator.get_sequence(id), seq);
    }

    let started = Instant::now();
    let id = scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(50));
            clock.set_tick(43);
        });
        generator.next_id()
    });

    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(generator.get_time(id), 43);
    assert_eq!(generator.get_sequence(id), 0);
}

#[test]
fn rollover_resets_sequence() {
    let clock = StepTime::at_tick(42);
    let generator = FastId::with_clock(config(12), clock.clone()).unwrap();

    for seq in 0..=generator.layout().step_mask() {
        let id = generator.poll_id().unwrap_ready();
        assert_eq!(generator.get_sequence(id), seq);
    }
    assert!(!generator.poll_id().unwrap_pending().is_zero());

    clock.set_tick(43);
    let id = generator.poll_id().unwrap_ready();
    assert_eq!(generator.get_time(id), 43);
    assert_eq!(generator.get_sequence(id), 0);
}

#[test]
fn clock_regression_never_reissues_ids() {
    let clock = StepTime::at_tick(50);
    let generator = FastId::with_clock(config(2), clock.clone()).unwrap();

    let mut seen = vec![generator.poll_id().unwrap_ready()];
    clock.set_tick(40);
    for _ in 0..3 {
        seen.push(generator.poll_id().unwrap_ready());
    }
    assert!(seen.iter().all(|&id| generator.get_time(id) == 50));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));

    // Sequence of tick 50 is used up; the generator waits for the clock.
    generator.poll_id().unwrap_pending();

    clock.set_tick(51);
    let id = generator.poll_id().unwrap_ready();
    assert_eq!(generator.get_time(id), 51);
    assert_eq!(generator.get_sequence(id), 0);
    assert!(id > *seen.last().unwrap());
}

#[test]
fn keeps_issuing_after_time_field_wraps() {
    let clock = StepTime::at_tick(3);
    let generator = FastId::with_clock(
        FastIdConfig::default()
            .with_bits(2, 2, 6)
            .with_epoch(UNIX_EPOCH_START)
            .with_node_id(1),
        clock.clone(),
    )
    .unwrap();

    for seq in 0..4 {
        let id = generator.poll_id().unwrap_ready();
        assert_eq!(generator.get_time(id), 3);
        assert_eq!(generator.get_sequence(id), seq);
    }
    assert!(!generator.poll_id().unwrap_pending().is_zero());

    for tick in 4..4000 {
        clock.set_tick(tick);
        let id = generator.poll_id().unwrap_ready();
        assert_eq!(generator.get_time(id), tick & 0b11);
        assert_eq!(generator.get_sequence(id), 0);
    }
}

#[test]
fn first_id_uses_the_current_tick_anywhere_in_the_field() {
    // Tick 200 sits in the upper half of an 8-bit time field.
    let generator = FastId::with_clock(
        FastIdConfig::default()
            .with_bits(8, 4, 4)
            .with_epoch(UNIX_EPOCH_START)
            .with_node_id(2),
        StepTime::at_tick(200),
    )
    .unwrap();

    let id = generator.poll_id().unwrap_ready();
    assert_eq!(generator.get_time(id), 200);
    assert_eq!(generator.get_sequence(id), 0);
    assert_eq!(generator.get_node(id), 2);
}

#[test]
fn ids_are_increasing_on_a_real_clock() {
    let generator = FastId::with_clock(config(12), MonotonicClock::new()).unwrap();
    let mut last = 0;
    for _ in 0..4096 * 64 {
        let id = generator.next_id();
        assert!(id > last, "{id} <= {last}");
        assert_eq!(generator.get_node(id), 1);
        last = id;
    }
}

#[test]
fn ids_are_unique_across_threads() {
    const IDS_PER_THREAD: usize = 4096 * 32;
    let threads = num_cpus::get().clamp(2, 8);
    let total = threads * IDS_PER_THREAD;

    let generator = FastId::with_clock(config(12), MonotonicClock::new()).unwrap();
    let seen = Mutex::new(HashSet::with_capacity(total));

    scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let mut local = Vec::with_capacity(IDS_PER_THREAD);
                let mut last = 0;
                for _ in 0..IDS_PER_THREAD {
                    let id = generator.next_id();
                    // Per thread, later calls observe later CAS wins.
                    assert!(id > last);
                    last = id;
                    local.push(id);
                }
                seen.lock().unwrap().extend(local);
            });
        }
    });

    assert_eq!(seen.lock().unwrap().len(), total, "expected {total} unique ids");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_ids_are_unique_across_tasks() {
    const TASKS: usize = 16;
    const IDS_PER_TASK: usize = 2048;

    let generator = Arc::new(FastId::with_clock(config(8), MonotonicClock::new()).unwrap());
    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(IDS_PER_TASK);
                for _ in 0..IDS_PER_TASK {
                    ids.push(generator.next_id_async().await);
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), TASKS * IDS_PER_TASK);
}

#[test]
fn decoders_recover_components() {
    let clock = StepTime::at_tick(1_000_000);
    let generator = FastId::with_clock(
        FastIdConfig::default()
            .with_bits(41, 12, 10)
            .with_epoch(UNIX_EPOCH_START)
            .with_node_id(777),
        clock.clone(),
    )
    .unwrap();

    for tick in 1_000_000..1_000_010 {
        clock.set_tick(tick);
        for seq in 0..5 {
            let id = generator.next_id();
            assert_eq!(generator.get_time(id), tick);
            assert_eq!(generator.get_sequence(id), seq);
            assert_eq!(generator.get_node(id), 777);
            assert_eq!(generator.layout().compose(tick, seq, 777), id);
        }
    }
}

#[test]
fn node_id_is_truncated_to_node_bits() {
    let generator = FastId::with_clock(
        config(12).with_node_id(0b1100_0101),
        FixedTime { nanos: 1 << TICK_SHIFT },
    )
    .unwrap();
    assert_eq!(generator.node_id(), 0b00_0101);
    assert_eq!(generator.get_node(generator.next_id()), 0b00_0101);
}

#[test]
fn derived_node_id_fits_layout() {
    let generator = FastId::with_clock(
        FastIdConfig::default().with_epoch(UNIX_EPOCH_START),
        MonotonicClock::new(),
    )
    .unwrap();
    assert!((0..=generator.layout().node_mask()).contains(&generator.node_id()));
}

#[test]
fn rejects_invalid_layout() {
    let err = FastId::new(FastIdConfig::default().with_bits(50, 12, 6)).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidLayout {
            time_bits: 50,
            step_bits: 12,
            node_bits: 6
        }
    );
}

#[test]
fn rejects_epoch_in_the_future() {
    let config = config(12).with_epoch(Duration::from_secs(100));
    let err = FastId::with_clock(config, FixedTime { nanos: 1 }).unwrap_err();
    assert!(matches!(err, Error::EpochAfterNow { .. }));
}
