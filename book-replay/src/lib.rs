#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity)]

//! # Book-Replay
//! Time-ordered limit order book snapshot store with manual navigation and
//! **time-compressed replay scheduling**.
//!
//! A loaded sequence of [`OrderBookSnapshot`]s is owned by a [`SnapshotStore`], which tracks the
//! single authoritative "current position" and pushes a consistent [`StoreView`] to subscribers on
//! every state change. Around the store sit two controllers:
//! * **[`Navigator`]**: absolute, relative (±1) and time-label position moves, clamped to the
//!   loaded sequence (out-of-range requests are silent no-ops, never errors).
//! * **[`ReplayScheduler`]**: animated playback from the first to the last snapshot, compressing
//!   (or expanding) the real inter-snapshot spacing into a caller-chosen total duration while
//!   preserving *relative* timing. Degenerate timing data falls back to a fixed cadence.
//!
//! ## Overview
//! Snapshots enter via a single bulk ingestion boundary ([`ingest`]): raw depth-indexed entries
//! (`Bid1`/`Bid1Size`..`Ask10`/`Ask10Size` plus a `Time` label) map to normalised
//! [`OrderBookSnapshot`]s, with the comparable [`NaiveTime`](chrono::NaiveTime) timestamp derived
//! exactly once from the label. The store replaces its sequence wholesale on [`SnapshotStore::load`]
//! and resets position to the start — consumers (chart, control surface) re-derive everything they
//! render from the pushed [`StoreView`].
//!
//! Replay scheduling is split in two: a pure interval computation ([`replay_intervals`]) that is
//! unit-testable without timers, and a spawned sequential task that walks those intervals with
//! [`tokio::time::sleep`], checking a cancellation token before every advance. [`ReplayScheduler::stop_replay`]
//! synchronously guarantees that no not-yet-fired transition ever fires.
//!
//! Manual navigation during an active replay deliberately does **not** cancel it — the visual
//! schedule desyncs and simply keeps advancing. See [`replay`] for the full policy.

/// Normalised order book snapshot & level types.
pub mod books;

/// Ingestion boundary: raw depth-indexed entries, time-label parsing, bulk JSON mapping.
pub mod ingest;

/// All errors generated at the data boundary.
pub mod error;

/// Defines an extensible logging setup.
pub mod logging;

/// Snapshot store: authoritative position, wholesale sequence replacement, and the synchronous
/// publish-subscribe notifier every consumer observes.
pub mod store;

/// Manual navigation over the store: absolute index, relative step, time-label lookup.
pub mod navigate;

/// Time-compressed replay: pure schedule computation plus the cancellable timer task that
/// drives position along it.
pub mod replay;

pub use books::{Level, MAX_DEPTH, OrderBookSnapshot};
pub use error::DataError;
pub use navigate::{Navigator, Step};
pub use replay::{FALLBACK_STEP, MIN_STEP, ReplayScheduler, replay_intervals};
pub use store::{SnapshotStore, StoreView, Subscription};
