//! Zone-aware temporal values
//!
//! Every temporal value carries a time zone. Arithmetic on timestamps runs on
//! absolute instants, while calendar arithmetic on dates runs on the local
//! calendar, so both stay correct across daylight-saving transitions.

use crate::{Error, Result};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike,
};
use chrono_tz::Tz;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Resolves a wall-clock time in a zone. Ambiguous times take the earlier
/// instant; times inside a gap are moved forward past the gap.
pub fn resolve_local(zone: Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => zone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| Error::InvalidValue(format!("{} does not exist in {}", naive, zone))),
    }
}

/// A calendar date in a zone.
#[derive(Clone, Copy, Debug)]
pub struct Date {
    pub date: NaiveDate,
    pub zone: Tz,
}

impl Date {
    pub fn new(date: NaiveDate, zone: Tz) -> Self {
        Self { date, zone }
    }

    pub fn from_ymd(year: i32, month: u32, day: u32, zone: Tz) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|date| Self::new(date, zone))
            .ok_or_else(|| Error::InvalidValue(format!("invalid date {}-{}-{}", year, month, day)))
    }

    pub fn add_days(&self, days: i64) -> Result<Self> {
        let date = Duration::try_days(days)
            .and_then(|delta| self.date.checked_add_signed(delta))
            .ok_or_else(|| Error::InvalidValue("date out of range".into()))?;
        Ok(Self::new(date, self.zone))
    }

    /// Whole calendar days from `other` to `self`.
    pub fn days_since(&self, other: &Date) -> i64 {
        (self.date - other.date).num_days()
    }

    /// The instant at which this date starts in its zone.
    pub fn start(&self) -> Result<DateTime<Tz>> {
        resolve_local(self.zone, self.date.and_time(NaiveTime::MIN))
    }

    /// Combines with a time of day in this date's zone. The time's
    /// milliseconds are applied to the wall clock, not to the instant.
    pub fn at(&self, time: &Time) -> Result<Timestamp> {
        let naive = self.date.and_time(NaiveTime::MIN)
            + Duration::try_milliseconds(time.millis)
                .ok_or_else(|| Error::InvalidValue("time out of range".into()))?;
        Ok(Timestamp::new(resolve_local(self.zone, naive)?))
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
    }
}

impl Eq for Date {}

impl Hash for Date {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.date.hash(state);
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

/// A time of day as milliseconds since midnight. The value is linear: adding
/// past midnight keeps counting instead of wrapping.
#[derive(Clone, Copy, Debug)]
pub struct Time {
    pub millis: i64,
    pub zone: Tz,
}

impl Time {
    pub fn new(millis: i64, zone: Tz) -> Self {
        Self { millis, zone }
    }

    pub fn from_naive(time: NaiveTime, zone: Tz) -> Self {
        let millis = time.num_seconds_from_midnight() as i64 * 1000
            + (time.nanosecond() / 1_000_000) as i64;
        Self::new(millis, zone)
    }

    pub fn add_millis(&self, millis: i64) -> Result<Self> {
        self.millis
            .checked_add(millis)
            .map(|millis| Self::new(millis, self.zone))
            .ok_or_else(|| Error::InvalidValue("time out of range".into()))
    }

    /// The wall-clock reading, wrapped into a single day.
    pub fn wall_clock(&self) -> NaiveTime {
        let millis = self.millis.rem_euclid(MILLIS_PER_DAY);
        NaiveTime::from_num_seconds_from_midnight_opt(
            (millis / 1000) as u32,
            ((millis % 1000) * 1_000_000) as u32,
        )
        .unwrap_or(NaiveTime::MIN)
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.millis == other.millis
    }
}

impl Eq for Time {}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.millis.hash(state);
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.millis.cmp(&other.millis)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wall_clock().format("%H:%M:%S"))
    }
}

/// An absolute instant rendered in a zone.
#[derive(Clone, Copy, Debug)]
pub struct Timestamp {
    pub instant: DateTime<Tz>,
}

impl Timestamp {
    pub fn new(instant: DateTime<Tz>) -> Self {
        Self { instant }
    }

    pub fn zone(&self) -> Tz {
        self.instant.timezone()
    }

    pub fn from_millis(millis: i64, zone: Tz) -> Result<Self> {
        DateTime::from_timestamp_millis(millis)
            .map(|utc| Self::new(utc.with_timezone(&zone)))
            .ok_or_else(|| Error::InvalidValue(format!("timestamp {} out of range", millis)))
    }

    pub fn millis(&self) -> i64 {
        self.instant.timestamp_millis()
    }

    pub fn add_millis(&self, millis: i64) -> Result<Self> {
        Duration::try_milliseconds(millis)
            .and_then(|delta| self.instant.checked_add_signed(delta))
            .map(Self::new)
            .ok_or_else(|| Error::InvalidValue("timestamp out of range".into()))
    }

    pub fn millis_since(&self, other: &Timestamp) -> i64 {
        (self.instant - other.instant).num_milliseconds()
    }

    pub fn date(&self) -> Date {
        Date::new(self.instant.date_naive(), self.zone())
    }

    pub fn time(&self) -> Time {
        Time::from_naive(self.instant.time(), self.zone())
    }

    pub fn year(&self) -> i32 {
        self.instant.year()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Timestamp {}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.millis().hash(state);
        self.instant.timestamp_subsec_nanos().hash(state);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant.format("%Y-%m-%d %H:%M:%S"))
    }
}
