use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Fixed maximum book depth provided by the source (`Bid1..Bid10`, `Ask1..Ask10`).
pub const MAX_DEPTH: usize = 10;

/// Normalised order book [`Level`] - one price/size pair at a given depth.
///
/// A `Level` only ever enters a snapshot with a non-zero price and amount; zero or absent pairs
/// are skipped at ingestion.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
pub struct Level {
    pub price: Decimal,
    pub amount: Decimal,
}

impl Level {
    pub fn new<T>(price: T, amount: T) -> Self
    where
        T: Into<Decimal>,
    {
        Self {
            price: price.into(),
            amount: amount.into(),
        }
    }
}

impl<T> From<(T, T)> for Level
where
    T: Into<Decimal>,
{
    fn from((price, amount): (T, T)) -> Self {
        Self::new(price, amount)
    }
}

/// Normalised order book snapshot - the full book state at one instant.
///
/// Constructed once at ingestion and never mutated afterwards. The loaded sequence is replaced
/// wholesale on [`SnapshotStore::load`](crate::store::SnapshotStore::load), never appended to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderBookSnapshot {
    /// Opaque wall-clock label (eg/ "10:15:30.123456") used for display and as a lookup key.
    ///
    /// Uniqueness across the sequence is not guaranteed by the source - lookups resolve to the
    /// first match.
    pub time: SmolStr,

    /// Comparable point-in-time derived from the `time` label exactly once at ingestion
    /// (time-of-day resolution, millisecond precision). Used only for interval arithmetic.
    pub timestamp: NaiveTime,

    /// Bid [`Level`]s in arrival order (best-first from the depth-indexed source, not re-sorted).
    pub bids: Vec<Level>,

    /// Ask [`Level`]s in arrival order (best-first from the depth-indexed source, not re-sorted).
    pub asks: Vec<Level>,
}

impl OrderBookSnapshot {
    /// Construct a new [`OrderBookSnapshot`].
    ///
    /// Levels are carried in arrival order - the depth-indexed source already provides them
    /// best-first.
    pub fn new<IterBids, IterAsks, L>(
        time: impl Into<SmolStr>,
        timestamp: NaiveTime,
        bids: IterBids,
        asks: IterAsks,
    ) -> Self
    where
        IterBids: IntoIterator<Item = L>,
        IterAsks: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        Self {
            time: time.into(),
            timestamp,
            bids: bids.into_iter().map(L::into).collect(),
            asks: asks.into_iter().map(L::into).collect(),
        }
    }

    /// Return the best bid [`Level`], if any.
    pub fn best_bid(&self) -> Option<&Level> {
        self.bids.first()
    }

    /// Return the best ask [`Level`], if any.
    pub fn best_ask(&self) -> Option<&Level> {
        self.asks.first()
    }

    /// Calculate the mid-price by taking the average of the best bid and ask prices.
    ///
    /// See Docs: <https://www.quantstart.com/articles/high-frequency-trading-ii-limit-order-book>
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(best_bid), Some(best_ask)) => {
                Some((best_bid.price + best_ask.price) / Decimal::TWO)
            }
            (Some(best_bid), None) => Some(best_bid.price),
            (None, Some(best_ask)) => Some(best_ask.price),
            (None, None) => None,
        }
    }
}
