/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Epoch milliseconds, as the Satori export endpoint expects them.
pub type EpochMillis = i64;
