use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::level::Level;

/// Metadata of one log record. The record's fields travel separately.
///
/// Every encoder receives an `Entry` together with the fields of the call.
/// What it does with each part is format specific: JSON puts all three in
/// its envelope, the text format writes the level and a padded message, and
/// CLF writes a non-empty message on a line of its own.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Entry, Level};
/// # use chrono::{FixedOffset, TimeZone};
/// let tz = FixedOffset::east_opt(2 * 3600).unwrap();
/// let entry = Entry::at(Level::Warn, "slow request", tz.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap());
///
/// assert_eq!(entry.message, "slow request");
/// assert_eq!(entry.time.offset().local_minus_utc(), 2 * 3600);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Severity of the record.
    pub level: Level,
    /// Free-form message. May be empty.
    pub message: String,
    /// When the record was made, with the offset it was taken in.
    pub time: DateTime<FixedOffset>,
}

impl Entry {
    /// Creates an entry stamped with the current UTC time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self::at(level, message, Utc::now())
    }

    /// Creates an entry stamped with `time`, keeping its UTC offset.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the record
    /// * `message` - The record message
    /// * `time` - Timestamp in any `chrono` time zone
    pub fn at<Tz: TimeZone>(level: Level, message: impl Into<String>, time: DateTime<Tz>) -> Self {
        Self {
            level,
            message: message.into(),
            time: time.fixed_offset(),
        }
    }
}
