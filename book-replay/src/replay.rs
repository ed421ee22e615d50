use crate::store::SnapshotStore;
use chrono::{NaiveTime, TimeDelta};
use parking_lot::Mutex;
use std::{
    fmt::{Debug, Formatter},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Floor applied to every scheduled replay interval, guaranteeing forward progress even for
/// zero-width original intervals.
pub const MIN_STEP: Duration = Duration::from_millis(10);

/// Fixed per-step cadence used when the real span of the sequence is non-positive (identical
/// timestamps or a day-boundary wrap) and proportional timing cannot be computed.
pub const FALLBACK_STEP: Duration = Duration::from_millis(100);

/// Compute the sequential replay delays for a timestamp sequence, compressed (or expanded) to
/// fit the `requested` total duration.
///
/// Returns one delay per transition, ie/ `timestamps.len() - 1` entries: the transition to index
/// `i + 1` fires `delays[0] + .. + delays[i]` after replay start. Each delay preserves the
/// *relative* share of real time between its snapshot pair, floored at [`MIN_STEP`].
///
/// Degenerate inputs never error:
/// * fewer than 2 timestamps: empty schedule.
/// * non-positive real span: [`FALLBACK_STEP`] cadence, `requested` ignored.
pub fn replay_intervals(timestamps: &[NaiveTime], requested: Duration) -> Vec<Duration> {
    let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) else {
        return Vec::new();
    };
    if timestamps.len() < 2 {
        return Vec::new();
    }

    let span = *last - *first;
    if span <= TimeDelta::zero() {
        warn!(
            ?span,
            count = timestamps.len(),
            "non-positive real span, replaying at the fallback cadence"
        );
        return vec![FALLBACK_STEP; timestamps.len() - 1];
    }

    let span_ms = span.num_milliseconds() as f64;
    let requested_ms = requested.as_secs_f64() * 1_000.0;

    timestamps
        .windows(2)
        .map(|pair| {
            // Out-of-order pairs inside an overall-positive span scale to zero and take the floor
            let real_ms = (pair[1] - pair[0]).num_milliseconds().max(0) as f64;
            let scaled_ms = real_ms / span_ms * requested_ms;
            Duration::from_secs_f64(scaled_ms / 1_000.0).max(MIN_STEP)
        })
        .collect()
}

struct ReplaySession {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Drives the [`SnapshotStore`] position along a time-compressed schedule.
///
/// One logical run at a time: `Idle -> Replaying -> Idle` (natural completion or cancel), and
/// [`ReplayScheduler::start_replay`] fully cancels any prior run before scheduling a new one.
/// Transitions fire strictly in increasing index order from a spawned sequential task - timer
/// jitter delays a transition but never reorders or skips one.
///
/// Policy (deliberate, matching the manual/replay interleaving contract): manual navigation
/// during an active replay does **not** cancel it, and neither does loading a new sequence. Both
/// merely desync the visual schedule; the store's defensive accessor absorbs any transition that
/// a shrinking reload left out-of-range.
pub struct ReplayScheduler {
    store: Arc<SnapshotStore>,
    session: Mutex<Option<ReplaySession>>,
}

impl ReplayScheduler {
    /// Construct an idle [`ReplayScheduler`] over the provided shared [`SnapshotStore`].
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self {
            store,
            session: Mutex::new(None),
        }
    }

    /// Start an animated replay from the first to the last snapshot, fitted to the `requested`
    /// total duration.
    ///
    /// Cancels any in-flight replay first, then returns immediately - transitions fire
    /// asynchronously on the tokio timer. Edge cases degrade without error: an empty sequence
    /// flips the replaying flag straight back off, a singleton jumps to index 0 and reports
    /// not-replaying.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_replay(&self, requested: Duration) {
        self.stop_replay();
        self.store.set_replaying(true);

        let view = self.store.view();
        if view.total() < 2 {
            if view.total() == 1 {
                self.store.set_position_unchecked(0);
            }
            self.store.set_replaying(false);
            return;
        }

        let timestamps = view
            .snapshots()
            .iter()
            .map(|snapshot| snapshot.timestamp)
            .collect::<Vec<_>>();
        let intervals = replay_intervals(&timestamps, requested);

        debug!(
            transitions = intervals.len(),
            ?requested,
            "starting order book replay"
        );

        let cancel = Arc::new(AtomicBool::new(false));
        let token = Arc::clone(&cancel);
        let store = Arc::clone(&self.store);
        let task = tokio::spawn(async move {
            // Immediate transition to the start of the sequence
            store.set_position_unchecked(0);

            for (step, delay) in intervals.into_iter().enumerate() {
                tokio::time::sleep(delay).await;
                if token.load(Ordering::Acquire) {
                    return;
                }
                store.set_position_unchecked(step + 1);
            }

            debug!("order book replay finished");
            store.set_replaying(false);
        });

        *self.session.lock() = Some(ReplaySession { cancel, task });
    }

    /// Cancel the active replay, if any.
    ///
    /// Synchronously guarantees that no not-yet-fired transition ever fires and flips the
    /// replaying flag off immediately. Safe to call when idle and safe to call repeatedly.
    pub fn stop_replay(&self) {
        if let Some(session) = self.session.lock().take() {
            session.cancel.store(true, Ordering::Release);
            session.task.abort();
            debug!("order book replay cancelled");
        }
        self.store.set_replaying(false);
    }

    /// True if a replay is currently driving the store position.
    pub fn is_replaying(&self) -> bool {
        self.store.is_replaying()
    }
}

impl Drop for ReplayScheduler {
    fn drop(&mut self) {
        // Scheduled transitions must not outlive the scheduler
        if let Some(session) = self.session.lock().take() {
            session.cancel.store(true, Ordering::Release);
            session.task.abort();
        }
    }
}

impl Debug for ReplayScheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayScheduler")
            .field("replaying", &self.is_replaying())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_plus_ms(ms: i64) -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    #[test]
    fn test_replay_intervals() {
        struct TestCase {
            name: &'static str,
            timestamps: Vec<NaiveTime>,
            requested: Duration,
            expected: Vec<Duration>,
        }

        let cases = vec![
            TestCase {
                name: "relative spacing preserved over requested duration",
                timestamps: vec![time_plus_ms(0), time_plus_ms(100), time_plus_ms(400)],
                requested: Duration::from_millis(4_000),
                expected: vec![Duration::from_millis(1_000), Duration::from_millis(3_000)],
            },
            TestCase {
                name: "zero-width original interval floored at MIN_STEP",
                timestamps: vec![time_plus_ms(0), time_plus_ms(0), time_plus_ms(1_000)],
                requested: Duration::from_millis(2_000),
                expected: vec![MIN_STEP, Duration::from_millis(2_000)],
            },
            TestCase {
                name: "non-positive span falls back to fixed cadence",
                timestamps: vec![time_plus_ms(500), time_plus_ms(500), time_plus_ms(500)],
                requested: Duration::from_millis(60_000),
                expected: vec![FALLBACK_STEP, FALLBACK_STEP],
            },
            TestCase {
                name: "day-boundary wrap falls back to fixed cadence",
                timestamps: vec![
                    NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                    NaiveTime::from_hms_opt(0, 0, 1).unwrap(),
                ],
                requested: Duration::from_millis(5_000),
                expected: vec![FALLBACK_STEP],
            },
            TestCase {
                name: "singleton has no transitions",
                timestamps: vec![time_plus_ms(0)],
                requested: Duration::from_millis(5_000),
                expected: vec![],
            },
            TestCase {
                name: "empty has no transitions",
                timestamps: vec![],
                requested: Duration::from_millis(5_000),
                expected: vec![],
            },
        ];

        for test in cases {
            assert_eq!(
                replay_intervals(&test.timestamps, test.requested),
                test.expected,
                "TC failed: {}",
                test.name
            );
        }
    }

    #[test]
    fn test_replay_intervals_cumulative_offsets_match_contract() {
        // Spec'd example: real stamps [0ms, 100ms, 400ms] over 4000ms fire at [0, 1000, 4000]
        let intervals = replay_intervals(
            &[time_plus_ms(0), time_plus_ms(100), time_plus_ms(400)],
            Duration::from_millis(4_000),
        );

        let mut cumulative = Duration::ZERO;
        let offsets = intervals
            .iter()
            .map(|interval| {
                cumulative += *interval;
                cumulative
            })
            .collect::<Vec<_>>();

        assert_eq!(
            offsets,
            vec![Duration::from_millis(1_000), Duration::from_millis(4_000)]
        );
    }

    #[test]
    fn test_replay_intervals_mid_sequence_regression_takes_floor() {
        // Overall span positive, but one out-of-order pair inside it
        let intervals = replay_intervals(
            &[time_plus_ms(0), time_plus_ms(300), time_plus_ms(200)],
            Duration::from_millis(1_000),
        );

        assert_eq!(intervals, vec![Duration::from_millis(1_500), MIN_STEP]);
    }
}
