use crate::books::OrderBookSnapshot;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use std::{
    fmt::{Debug, Formatter},
    sync::{Arc, Weak},
};
use tracing::debug;

/// Unique identifier of a store [`Subscription`].
pub type SubscriberId = u64;

type Callback = Arc<dyn Fn(&StoreView) + Send + Sync>;

/// Consistent, immutable view of the [`SnapshotStore`] observable state.
///
/// Every view is constructed atomically under the store state lock, so a subscriber never sees a
/// half-applied sequence+position pair - a wholesale sequence replacement and its position reset
/// arrive as one event.
#[derive(Clone)]
pub struct StoreView {
    sequence: Arc<Vec<OrderBookSnapshot>>,
    position: usize,
    replaying: bool,
}

impl StoreView {
    /// Return the [`OrderBookSnapshot`] at the current position.
    ///
    /// Defensive accessor: `None` for an empty sequence *or* a transiently out-of-range position
    /// (eg/ a replay transition racing a concurrent shrinking reload), never a panic.
    pub fn current(&self) -> Option<&OrderBookSnapshot> {
        self.sequence.get(self.position)
    }

    /// Current position in the loaded sequence.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total number of loaded [`OrderBookSnapshot`]s.
    pub fn total(&self) -> usize {
        self.sequence.len()
    }

    /// Full loaded sequence, in time order.
    pub fn snapshots(&self) -> &[OrderBookSnapshot] {
        &self.sequence
    }

    /// Ordered wall-clock labels, parallel to the snapshot order.
    pub fn time_labels(&self) -> impl Iterator<Item = &SmolStr> {
        self.sequence.iter().map(|snapshot| &snapshot.time)
    }

    /// True if an animated replay is currently driving the position.
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// True if the position is at the first snapshot (or the sequence is empty).
    pub fn is_at_start(&self) -> bool {
        self.position == 0
    }

    /// True if the position is at the last snapshot.
    pub fn is_at_end(&self) -> bool {
        !self.sequence.is_empty() && self.position >= self.sequence.len() - 1
    }
}

impl Debug for StoreView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreView")
            .field("total", &self.sequence.len())
            .field("position", &self.position)
            .field("replaying", &self.replaying)
            .finish()
    }
}

struct State {
    sequence: Arc<Vec<OrderBookSnapshot>>,
    position: usize,
    replaying: bool,
}

impl State {
    fn view(&self) -> StoreView {
        StoreView {
            sequence: Arc::clone(&self.sequence),
            position: self.position,
            replaying: self.replaying,
        }
    }
}

#[derive(Default)]
struct Subscribers {
    next_id: SubscriberId,
    entries: Vec<(SubscriberId, Callback)>,
}

/// Owns the time-ordered [`OrderBookSnapshot`] sequence and the single authoritative position,
/// pushing a consistent [`StoreView`] to every subscriber on each state change.
///
/// Explicitly constructed and shared via `Arc` (constructor injection) - there is no global
/// singleton. Position is only ever mutated through [`Navigator`](crate::navigate::Navigator)
/// (clamped) or the [`ReplayScheduler`](crate::replay::ReplayScheduler) (in-range by
/// construction).
pub struct SnapshotStore {
    state: RwLock<State>,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl SnapshotStore {
    /// Construct a new empty [`SnapshotStore`].
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                sequence: Arc::new(Vec::new()),
                position: 0,
                replaying: false,
            }),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    /// Replace the loaded sequence wholesale, resetting position to the start.
    ///
    /// Subscribers observe the replacement and position reset as one atomic event. An active
    /// replay is deliberately *not* cancelled (see [`replay`](crate::replay) for the policy) -
    /// its out-of-range writes are absorbed by the defensive [`StoreView::current`] accessor.
    pub fn load(&self, snapshots: Vec<OrderBookSnapshot>) {
        debug!(total = snapshots.len(), "loading order book snapshot sequence");
        self.update(|state| {
            state.sequence = Arc::new(snapshots);
            state.position = 0;
            true
        });
    }

    /// Atomically capture a consistent [`StoreView`] of the current state.
    pub fn view(&self) -> StoreView {
        self.state.read().view()
    }

    /// Return a clone of the [`OrderBookSnapshot`] at the current position, if any.
    pub fn current(&self) -> Option<OrderBookSnapshot> {
        self.view().current().cloned()
    }

    /// Current position in the loaded sequence.
    pub fn position(&self) -> usize {
        self.state.read().position
    }

    /// Total number of loaded [`OrderBookSnapshot`]s.
    pub fn total(&self) -> usize {
        self.state.read().sequence.len()
    }

    /// Ordered wall-clock labels, parallel to the snapshot order.
    pub fn time_labels(&self) -> Vec<SmolStr> {
        self.view().time_labels().cloned().collect()
    }

    /// True if an animated replay is currently driving the position.
    pub fn is_replaying(&self) -> bool {
        self.state.read().replaying
    }

    /// Register a subscriber callback, invoked synchronously with a consistent [`StoreView`] on
    /// every state change.
    ///
    /// Returns an explicit [`Subscription`] handle - call [`Subscription::unsubscribe`] to stop
    /// receiving events.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreView) + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.lock();
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Set the position from the replay scheduler, bypassing the navigation clamp.
    ///
    /// Replay indices are in-range by construction against the sequence captured at replay
    /// start; a concurrent reload may leave the position transiently out-of-range, which the
    /// defensive [`StoreView::current`] accessor absorbs.
    pub(crate) fn set_position_unchecked(&self, index: usize) {
        self.update(|state| {
            state.position = index;
            true
        });
    }

    /// Apply a position update computed from the current `(position, sequence)` under the write
    /// lock (atomic check-and-set for the navigation clamp policy).
    ///
    /// Returning `None` leaves the position untouched and emits nothing.
    pub(crate) fn update_position<F>(&self, f: F)
    where
        F: FnOnce(usize, &[OrderBookSnapshot]) -> Option<usize>,
    {
        self.update(|state| match f(state.position, &state.sequence) {
            Some(next) => {
                state.position = next;
                true
            }
            None => false,
        });
    }

    /// Flip the observable replaying flag.
    ///
    /// Emits nothing when the flag already holds the requested value, so an idle
    /// [`stop_replay`](crate::replay::ReplayScheduler::stop_replay) pushes no spurious view.
    pub(crate) fn set_replaying(&self, replaying: bool) {
        self.update(|state| {
            let changed = state.replaying != replaying;
            state.replaying = replaying;
            changed
        });
    }

    /// Apply a state mutation and, if it reports a change, push the resulting [`StoreView`] to
    /// all subscribers.
    ///
    /// The view is constructed under the state lock but callbacks run after it is released, so a
    /// subscriber may itself call back into the store.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut State) -> bool,
    {
        let view = {
            let mut state = self.state.write();
            if !f(&mut state) {
                return;
            }
            state.view()
        };

        let callbacks = {
            let subscribers = self.subscribers.lock();
            subscribers
                .entries
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect::<Vec<_>>()
        };

        for callback in callbacks {
            callback(&view);
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SnapshotStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("view", &self.view())
            .field("subscribers", &self.subscribers.lock().entries.len())
            .finish()
    }
}

/// Explicit handle to a registered store subscriber.
///
/// Dropping the handle does *not* unsubscribe - call [`Subscription::unsubscribe`].
#[derive(Debug)]
#[must_use]
pub struct Subscription {
    id: SubscriberId,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// Identifier of this subscriber.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove this subscriber from the store.
    ///
    /// Safe to call after the store has been dropped (no-op).
    pub fn unsubscribe(self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}
