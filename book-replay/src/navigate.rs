use crate::store::SnapshotStore;
use derive_more::Constructor;
use std::sync::Arc;

/// Relative single-step move direction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Step {
    Forward,
    Backward,
}

/// Manual navigation over a shared [`SnapshotStore`].
///
/// All three operations share one policy: an invalid request (out-of-range index, boundary step,
/// unknown time label) is a silent no-op, never an error. UI-driven races with concurrent data
/// reloads are expected, so bound checks and the position write happen atomically under the store
/// write lock.
///
/// Together with the [`ReplayScheduler`](crate::replay::ReplayScheduler) these are the only
/// position mutators - and navigating during an active replay deliberately does *not* cancel it.
#[derive(Debug, Clone, Constructor)]
pub struct Navigator {
    store: Arc<SnapshotStore>,
}

impl Navigator {
    /// Move to an absolute `index`, iff `0 <= index < total()`.
    pub fn go_to(&self, index: usize) {
        self.store
            .update_position(|_, sequence| (index < sequence.len()).then_some(index));
    }

    /// Move the position by one, clamped to `[0, total() - 1]`.
    ///
    /// At a boundary this is a no-op, not a wraparound.
    pub fn step(&self, step: Step) {
        self.store.update_position(|position, sequence| match step {
            Step::Forward if position + 1 < sequence.len() => Some(position + 1),
            Step::Backward if position > 0 && !sequence.is_empty() => Some(position - 1),
            _ => None,
        });
    }

    /// Move to the first snapshot whose `time` label equals `label`, if present.
    ///
    /// Duplicate labels resolve to the first match; an unknown label is a no-op.
    pub fn go_to_time(&self, label: &str) {
        self.store.update_position(|_, sequence| {
            sequence.iter().position(|snapshot| snapshot.time == label)
        });
    }
}
