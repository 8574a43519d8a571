//! Time keeping for the watch face
//!
//! The watch has no battery backed RTC, so wall-clock time is a reference
//! point (set from the build time or from the phone's Current Time Service)
//! plus the uptime that passed since then.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike,
};
use heapless::String;

/// Capacity of a formatted date line such as `Sat 17 Oct 2026`.
pub const DATE_LEN: usize = 24;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// Fewer bytes than a CTS "current time" record
    TooShort,
    /// Fields do not form a valid date and time
    InvalidDate,
    /// Epoch outside the representable range
    OutOfRange,
}

/// A wall-clock time and the uptime it was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    /// Clock time (UTC)
    time: NaiveDateTime,
    /// Uptime in milliseconds when `time` was valid
    uptime_ms: u64,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            time: NaiveDateTime::UNIX_EPOCH,
            uptime_ms: 0,
        }
    }
}

impl TimeReference {
    /// Create new time reference from a UTC date and time
    pub fn from_datetime(time: NaiveDateTime, uptime_ms: u64) -> Self {
        Self { time, uptime_ms }
    }

    /// Create new time reference from seconds since the Unix epoch
    pub fn from_epoch(secs: i64, uptime_ms: u64) -> Result<Self, TimeError> {
        let time = DateTime::from_timestamp(secs, 0)
            .ok_or(TimeError::OutOfRange)?
            .naive_utc();
        Ok(Self { time, uptime_ms })
    }

    /// Create new time reference from Current Time Service data
    ///
    /// Layout: year (u16 LE), month, day, hours, minutes, seconds,
    /// day of week, fractions of 1/256 s, adjust reason.
    pub fn from_cts_bytes(bytes: &[u8], uptime_ms: u64) -> Result<Self, TimeError> {
        if bytes.len() < 9 {
            return Err(TimeError::TooShort);
        }

        let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
        let month = bytes[2] as u32;
        let day = bytes[3] as u32;
        let hour = bytes[4] as u32;
        let min = bytes[5] as u32;
        let sec = bytes[6] as u32;
        // Convert fractions_256 to milliseconds
        let milli = bytes[8] as u32 * 1000 / 256;

        let time = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, min, sec, milli))
            .ok_or(TimeError::InvalidDate)?;

        Ok(Self { time, uptime_ms })
    }
}

/// Wall clock built on top of the uptime counter.
#[derive(Debug, Default)]
pub struct TimeManager {
    reference: TimeReference,
}

impl TimeManager {
    /// Initialize time keeping with a known reference
    pub fn new(reference: TimeReference) -> Self {
        Self { reference }
    }

    /// Current UTC time at the given uptime
    pub fn now(&self, uptime_ms: u64) -> NaiveDateTime {
        let elapsed = uptime_ms.saturating_sub(self.reference.uptime_ms);
        TimeDelta::try_milliseconds(elapsed as i64)
            .and_then(|delta| self.reference.time.checked_add_signed(delta))
            .unwrap_or(self.reference.time)
    }

    /// Milliseconds since the Unix epoch at the given uptime
    pub fn now_millis(&self, uptime_ms: u64) -> u64 {
        self.now(uptime_ms).and_utc().timestamp_millis().max(0) as u64
    }

    /// Update time reference
    pub fn set_time(&mut self, reference: TimeReference) {
        self.reference = reference;
    }
}

/// Offset from a Local Time Information record: time zone in steps of
/// 15 minutes (i8), then the DST offset in steps of 15 minutes (255 when
/// unknown).
pub fn offset_from_local_time_info(bytes: &[u8]) -> Result<FixedOffset, TimeError> {
    let &[zone, dst, ..] = bytes else {
        return Err(TimeError::TooShort);
    };
    let zone = zone as i8;
    if zone == i8::MIN {
        // Time zone unknown
        return Err(TimeError::OutOfRange);
    }
    let dst = if dst == u8::MAX { 0 } else { dst as i32 };

    FixedOffset::east_opt((zone as i32 + dst) * 15 * 60).ok_or(TimeError::OutOfRange)
}

/// Convert a UTC time into the wall-clock time of `offset`.
pub fn to_local(utc: NaiveDateTime, offset: FixedOffset) -> NaiveDateTime {
    offset.from_utc_datetime(&utc).naive_local()
}

/// Delay until the next multiple of `interval_ms`, so redraws line up with
/// wall-clock ticks.
pub fn next_tick_delay(now_ms: u64, interval_ms: u64) -> u64 {
    interval_ms - (now_ms % interval_ms)
}

/// 24-hour hour and minute of a local time.
pub fn hour_minute(local: &NaiveDateTime) -> (u8, u8) {
    (local.hour() as u8, local.minute() as u8)
}

/// Format the date line, e.g. `Sat 17 Oct 2026`.
pub fn format_date(local: &NaiveDateTime) -> String<DATE_LEN> {
    let mut buf = [0u8; DATE_LEN];
    let mut line = String::new();

    let formatted = format_no_std::show(
        &mut buf,
        format_args!(
            "{} {:02} {} {}",
            WEEKDAYS[local.weekday().num_days_from_monday() as usize],
            local.day(),
            MONTHS[local.month0() as usize],
            local.year()
        ),
    );

    if let Ok(text) = formatted {
        // Cannot overflow: both buffers share the capacity
        let _ = line.push_str(text);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_current_time_service_record() {
        // 2024-03-03 14:05:09, Sunday, 128/256 s
        let bytes = [0xE8, 0x07, 3, 3, 14, 5, 9, 7, 128, 0];
        let reference = TimeReference::from_cts_bytes(&bytes, 1_000).unwrap();
        let clock = TimeManager::new(reference);

        assert_eq!(
            clock.now(1_000),
            NaiveDate::from_ymd_opt(2024, 3, 3)
                .unwrap()
                .and_hms_milli_opt(14, 5, 9, 500)
                .unwrap()
        );
    }

    #[test]
    fn rejects_invalid_cts_records() {
        assert_eq!(
            TimeReference::from_cts_bytes(&[0xE8, 0x07, 3], 0),
            Err(TimeError::TooShort)
        );
        let feb_30 = [0xE8, 0x07, 2, 30, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            TimeReference::from_cts_bytes(&feb_30, 0),
            Err(TimeError::InvalidDate)
        );
    }

    #[test]
    fn clock_advances_with_uptime() {
        let start = datetime(2026, 10, 17, 23, 59, 59);
        let clock = TimeManager::new(TimeReference::from_datetime(start, 5_000));

        assert_eq!(clock.now(6_000), datetime(2026, 10, 18, 0, 0, 0));
        // Uptime before the reference never moves the clock backwards
        assert_eq!(clock.now(0), start);
    }

    #[test]
    fn epoch_reference() {
        let reference = TimeReference::from_epoch(1_700_000_000, 0).unwrap();
        let clock = TimeManager::new(reference);
        assert_eq!(clock.now_millis(250), 1_700_000_000_250);
    }

    #[test]
    fn tick_delay_aligns_to_interval() {
        assert_eq!(next_tick_delay(1_000, 500), 500);
        assert_eq!(next_tick_delay(1_001, 500), 499);
        assert_eq!(next_tick_delay(1_499, 500), 1);
    }

    #[test]
    fn local_time_applies_offset() {
        let utc = datetime(2026, 10, 17, 23, 30, 0);
        let offset = FixedOffset::east_opt(2 * 3_600).unwrap();
        assert_eq!(hour_minute(&to_local(utc, offset)), (1, 30));
    }

    #[test]
    fn local_time_information() {
        // UTC+1 with one hour of daylight saving
        let offset = offset_from_local_time_info(&[4, 4]).unwrap();
        assert_eq!(offset.local_minus_utc(), 2 * 3_600);

        // UTC-3:30, DST unknown
        let offset = offset_from_local_time_info(&[(-14i8) as u8, 255]).unwrap();
        assert_eq!(offset.local_minus_utc(), -(3 * 3_600 + 30 * 60));

        assert_eq!(offset_from_local_time_info(&[4]), Err(TimeError::TooShort));
        assert_eq!(
            offset_from_local_time_info(&[0x80, 0]),
            Err(TimeError::OutOfRange)
        );
    }

    #[test]
    fn date_line() {
        let local = datetime(2026, 10, 17, 9, 0, 0);
        assert_eq!(format_date(&local).as_str(), "Sat 17 Oct 2026");

        let local = datetime(2027, 1, 4, 9, 0, 0);
        assert_eq!(format_date(&local).as_str(), "Mon 04 Jan 2027");
    }
}
