use crate::{
    books::{Level, MAX_DEPTH, OrderBookSnapshot},
    error::DataError,
};
use chrono::NaiveTime;
use fnv::FnvHashMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use smol_str::{SmolStr, format_smolstr};

/// One raw, un-normalised source entry: a `Time` label plus flat depth-indexed fields
/// (`Bid1`, `Bid1Size`, .. `Ask10`, `Ask10Size`).
///
/// Field values may arrive as JSON numbers, numeric strings, or null - anything that does not
/// resolve to a positive [`Decimal`] pair is skipped, never a hard failure.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrderBookEntry {
    #[serde(rename = "Time")]
    pub time: SmolStr,
    #[serde(flatten)]
    pub fields: FnvHashMap<SmolStr, Value>,
}

impl RawOrderBookEntry {
    /// Extract the [`Level`] at the provided 1-based depth for one side, if both the price and
    /// size fields are present and non-zero.
    fn level(&self, side: &str, depth: usize) -> Option<Level> {
        let price = decimal_field(self.fields.get(format_smolstr!("{side}{depth}").as_str())?)?;
        let size = decimal_field(self.fields.get(format_smolstr!("{side}{depth}Size").as_str())?)?;

        (!price.is_zero() && !size.is_zero()).then(|| Level { price, amount: size })
    }
}

impl TryFrom<RawOrderBookEntry> for OrderBookSnapshot {
    type Error = DataError;

    fn try_from(raw: RawOrderBookEntry) -> Result<Self, Self::Error> {
        let timestamp = parse_time_label(&raw.time)?;

        let mut bids = Vec::with_capacity(MAX_DEPTH);
        let mut asks = Vec::with_capacity(MAX_DEPTH);
        for depth in 1..=MAX_DEPTH {
            if let Some(bid) = raw.level("Bid", depth) {
                bids.push(bid);
            }
            if let Some(ask) = raw.level("Ask", depth) {
                asks.push(ask);
            }
        }

        Ok(Self {
            time: raw.time,
            timestamp,
            bids,
            asks,
        })
    }
}

/// Map a bulk JSON array of [`RawOrderBookEntry`]s to the normalised, time-ordered
/// [`OrderBookSnapshot`] sequence.
///
/// This is the single bulk read the system performs - file or transport I/O is the caller's
/// concern.
pub fn snapshots_from_json(payload: &[u8]) -> Result<Vec<OrderBookSnapshot>, DataError> {
    let raw = serde_json::from_slice::<Vec<RawOrderBookEntry>>(payload)?;
    raw.into_iter().map(OrderBookSnapshot::try_from).collect()
}

/// Parse a wall-clock label ("hours:minutes:seconds.fraction") into a [`NaiveTime`] with
/// millisecond precision.
///
/// Only the first 3 digits of the fractional component are used (eg/ microsecond labels truncate
/// to milliseconds). A missing fraction is treated as zero.
pub fn parse_time_label(label: &str) -> Result<NaiveTime, DataError> {
    let mut parts = label.split([':', '.']);

    let component = |part: Option<&str>| {
        part.and_then(|value| value.parse::<u32>().ok())
            .ok_or_else(|| DataError::InvalidTimeLabel(SmolStr::new(label)))
    };

    let hour = component(parts.next())?;
    let min = component(parts.next())?;
    let sec = component(parts.next())?;
    let milli = match parts.next() {
        Some(fraction) => component(Some(fraction.get(..3).unwrap_or(fraction)))?,
        None => 0,
    };

    NaiveTime::from_hms_milli_opt(hour, min, sec, milli)
        .ok_or_else(|| DataError::InvalidTimeLabel(SmolStr::new(label)))
}

fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => number.to_string().parse().ok(),
        Value::String(string) => string.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_time_label() {
        struct TestCase {
            name: &'static str,
            input: &'static str,
            expected: Option<NaiveTime>,
        }

        let cases = vec![
            TestCase {
                name: "microsecond fraction truncates to millis",
                input: "10:15:30.123456",
                expected: NaiveTime::from_hms_milli_opt(10, 15, 30, 123),
            },
            TestCase {
                name: "exactly three fraction digits",
                input: "10:15:30.123",
                expected: NaiveTime::from_hms_milli_opt(10, 15, 30, 123),
            },
            TestCase {
                name: "short fraction used as-is",
                input: "10:15:30.5",
                expected: NaiveTime::from_hms_milli_opt(10, 15, 30, 5),
            },
            TestCase {
                name: "no fraction",
                input: "10:15:30",
                expected: NaiveTime::from_hms_milli_opt(10, 15, 30, 0),
            },
            TestCase {
                name: "colon separated fraction",
                input: "10:15:30:123456",
                expected: NaiveTime::from_hms_milli_opt(10, 15, 30, 123),
            },
            TestCase {
                name: "missing components",
                input: "10:15",
                expected: None,
            },
            TestCase {
                name: "non-numeric",
                input: "not-a-time",
                expected: None,
            },
            TestCase {
                name: "out of range hours",
                input: "25:00:00.000",
                expected: None,
            },
        ];

        for test in cases {
            assert_eq!(
                parse_time_label(test.input).ok(),
                test.expected,
                "TC failed: {}",
                test.name
            );
        }
    }

    #[test]
    fn test_raw_entry_to_snapshot() {
        let raw = serde_json::from_value::<RawOrderBookEntry>(json!({
            "Time": "09:30:00.000100",
            "Bid1": 101.5, "Bid1Size": 3,
            "Bid2": "101.0", "Bid2Size": "7",
            "Bid3": 0, "Bid3Size": 5,
            "Bid4": 100.0, "Bid4Size": null,
            "Ask1": 102.0, "Ask1Size": 2,
            "Ask3": 103.0, "Ask3Size": 4,
        }))
        .unwrap();

        let snapshot = OrderBookSnapshot::try_from(raw).unwrap();

        assert_eq!(snapshot.time, "09:30:00.000100");
        assert_eq!(
            snapshot.timestamp,
            NaiveTime::from_hms_milli_opt(9, 30, 0, 0).unwrap()
        );

        // Bid3 (zero price), Bid4 (null size) and all absent depths skipped
        assert_eq!(
            snapshot.bids,
            vec![
                Level::new(dec!(101.5), dec!(3)),
                Level::new(dec!(101.0), dec!(7)),
            ]
        );

        // Gaps in the depth index are tolerated: remaining levels keep arrival order
        assert_eq!(
            snapshot.asks,
            vec![
                Level::new(dec!(102.0), dec!(2)),
                Level::new(dec!(103.0), dec!(4)),
            ]
        );
    }

    #[test]
    fn test_snapshots_from_json() {
        let payload = json!([
            { "Time": "09:30:00.000000", "Bid1": 100, "Bid1Size": 1 },
            { "Time": "09:30:00.100000", "Ask1": 101, "Ask1Size": 2 },
        ])
        .to_string();

        let snapshots = snapshots_from_json(payload.as_bytes()).unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].bids.len(), 1);
        assert_eq!(snapshots[1].asks.len(), 1);
        assert!(snapshots[0].timestamp < snapshots[1].timestamp);
    }

    #[test]
    fn test_snapshots_from_json_invalid_label_errors() {
        let payload = json!([{ "Time": "garbage" }]).to_string();

        assert!(matches!(
            snapshots_from_json(payload.as_bytes()),
            Err(DataError::InvalidTimeLabel(_))
        ));
    }
}
