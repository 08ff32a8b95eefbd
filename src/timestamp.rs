//! Entry modification timestamps.
//!
//! ZIP stores entry times in MS-DOS format: a calendar date and a wall-clock
//! time with two-second resolution and no time zone. [`Timestamp`] keeps those
//! fields as stored and offers conversions that interpret them as UTC.
//!
//! # Example
//!
//! ```rust
//! use zipcull::Timestamp;
//!
//! let ts = Timestamp::new(2024, 3, 15, 12, 30, 44);
//! assert_eq!(ts.to_string(), "2024-03-15 12:30:44");
//! assert_eq!(ts.as_unix_secs(), 1_710_505_844);
//! ```

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use filetime::FileTime;

const SECONDS_PER_DAY: i64 = 86_400;

/// A calendar timestamp as stored in an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Timestamp {
    /// Creates a timestamp from calendar fields.
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Returns the year.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Returns the month (1-12).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day of the month (1-31).
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Returns the second (0-58, always even in archives).
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Returns the timestamp as Unix seconds, reading the fields as UTC.
    pub fn as_unix_secs(&self) -> i64 {
        let days = days_from_civil(
            i64::from(self.year),
            i64::from(self.month.clamp(1, 12)),
            i64::from(self.day.max(1)),
        );
        days * SECONDS_PER_DAY
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }

    /// Converts to a `SystemTime`.
    pub fn as_system_time(&self) -> SystemTime {
        let secs = self.as_unix_secs();
        if secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(secs as u64)
        } else {
            UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
        }
    }

    /// Converts to a [`FileTime`] for setting file modification times.
    pub fn as_file_time(&self) -> FileTime {
        FileTime::from_unix_time(self.as_unix_secs(), 0)
    }
}

impl Default for Timestamp {
    /// Returns the MS-DOS epoch (1980-01-01 00:00:00).
    fn default() -> Self {
        Self::new(1980, 1, 1, 0, 0, 0)
    }
}

impl From<zip::DateTime> for Timestamp {
    fn from(dt: zip::DateTime) -> Self {
        Self::new(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        let ts = Timestamp::new(1970, 1, 1, 0, 0, 0);
        assert_eq!(ts.as_unix_secs(), 0);
        assert_eq!(ts.as_system_time(), UNIX_EPOCH);
    }

    #[test]
    fn test_dos_epoch_default() {
        let ts = Timestamp::default();
        assert_eq!(ts.as_unix_secs(), 315_532_800);
        assert_eq!(ts.to_string(), "1980-01-01 00:00:00");
    }

    #[test]
    fn test_leap_day() {
        let ts = Timestamp::new(2000, 2, 29, 0, 0, 0);
        assert_eq!(ts.as_unix_secs(), 951_782_400);
    }

    #[test]
    fn test_end_of_year() {
        let ts = Timestamp::new(2023, 12, 31, 23, 59, 58);
        assert_eq!(ts.as_unix_secs(), 1_704_067_198);
    }

    #[test]
    fn test_file_time() {
        let ts = Timestamp::new(2024, 3, 15, 12, 30, 44);
        let ft = ts.as_file_time();
        assert_eq!(ft.unix_seconds(), ts.as_unix_secs());
        assert_eq!(ft.nanoseconds(), 0);
    }

    #[test]
    fn test_from_zip_datetime() {
        let dt = zip::DateTime::from_date_and_time(2021, 7, 4, 9, 8, 6).unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts, Timestamp::new(2021, 7, 4, 9, 8, 6));
    }

    #[test]
    fn test_ordering() {
        let early = Timestamp::new(2020, 1, 1, 0, 0, 0);
        let late = Timestamp::new(2020, 1, 1, 0, 0, 2);
        assert!(early < late);
    }
}
