use smol_str::SmolStr;
use thiserror::Error;

/// All errors generated in `book-replay`.
///
/// Only the bulk ingestion boundary can fail - navigation and replay never surface errors
/// (out-of-range requests, degenerate timing data and empty/singleton sequences all degrade to
/// documented safe behaviour).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid time label: {0}")]
    InvalidTimeLabel(SmolStr),

    #[error("deserialising raw order book entries failed: {0}")]
    Serde(#[from] serde_json::Error),
}
