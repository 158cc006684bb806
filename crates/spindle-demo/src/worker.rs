use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use spindle::{CancellationToken, FastId};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};

/// Ids drawn between two checks of the cancellation token.
const BATCH: u64 = 4096;

/// Draws ids from the shared generator until cancelled.
///
/// Every id a single worker observes must be strictly greater than the one
/// before it; a violation is logged as an error rather than aborting the
/// worker.
pub async fn draw_ids(
    index: usize,
    generator: Arc<FastId>,
    drawn: Arc<AtomicU64>,
    token: CancellationToken,
) {
    let mut last = i64::MIN;

    while !token.is_cancelled() {
        for _ in 0..BATCH {
            let id = generator.next_id_async().await;
            if id <= last {
                tracing::error!(worker = index, id, last, "id did not increase");
            }
            last = id;
        }
        drawn.fetch_add(BATCH, Ordering::Relaxed);
        // Ready polls never suspend, so give the scheduler a turn per batch.
        tokio::task::yield_now().await;
    }

    if last != i64::MIN {
        tracing::debug!(
            worker = index,
            time = generator.get_time(last),
            sequence = generator.get_sequence(last),
            "worker stopped"
        );
    }
}

/// Logs aggregate throughput every `every` until cancelled.
pub async fn report_throughput(drawn: Arc<AtomicU64>, every: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut previous = 0;
    let mut previous_at = Instant::now();
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let total = drawn.load(Ordering::Relaxed);
        let now = Instant::now();
        let rate = (total - previous) as f64 / now.duration_since(previous_at).as_secs_f64();
        tracing::info!(total, ids_per_sec = rate.round() as u64, "throughput");
        previous = total;
        previous_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle::{FastIdConfig, Supervisor};
    use tokio::time::{sleep, timeout};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn workers_draw_until_cancelled() {
        let generator = Arc::new(FastId::new(FastIdConfig::default().with_node_id(1)).unwrap());
        let drawn = Arc::new(AtomicU64::new(0));
        let supervisor = Supervisor::new();

        for index in 0..2 {
            let generator = Arc::clone(&generator);
            let drawn = Arc::clone(&drawn);
            supervisor.start_named("worker", move |token| {
                draw_ids(index, generator, drawn, token)
            });
        }
        {
            let drawn = Arc::clone(&drawn);
            supervisor.start_named("reporter", move |token| {
                report_throughput(drawn, Duration::from_millis(10), token)
            });
        }

        timeout(Duration::from_secs(10), async {
            while drawn.load(Ordering::Relaxed) < 2 * BATCH {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(
            supervisor
                .cancel_and_wait_timeout(Duration::from_secs(10))
                .await
        );
        assert_eq!(drawn.load(Ordering::Relaxed) % BATCH, 0);
    }
}
