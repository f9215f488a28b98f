// ⚠️ Error model for the analytics core
//
// Record-level conditions (timestamp, amount) are recovered where they occur.
// Request-level conditions (granularity, data source) reach the caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// A record's timestamp is missing or cannot be parsed
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// A record's monetary amount is missing or non-numeric
    #[error("Malformed amount: {0}")]
    MalformedAmount(String),

    /// Caller passed an interval outside daily|monthly|quarterly|yearly
    #[error("Invalid granularity '{0}' (expected daily, monthly, quarterly or yearly)")]
    InvalidGranularity(String),

    /// The record fetch failed; no retry is attempted
    #[error("Data source unavailable for collection '{collection}': {reason}")]
    DataSourceUnavailable { collection: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
