// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time bucketing for calculated-field aggregation.
//!
//! The main components are:
//! - `IntervalKey`: An immutable half-open `[start, end)` bucket used as a map
//!   key. Two keys are equal when their bounds are equal, regardless of how
//!   they were constructed, so independent argument windows line up on the
//!   same buckets.
//! - `IntervalCalculator`: Maps an instant to the bucket containing it, and a
//!   bucket start to the start of the following bucket.
//!
//! Calendar buckets (day, week, month, quarter, year) are computed on the
//! local wall clock of the configured timezone, so a day bucket spanning a DST
//! transition is 23 or 25 hours long. Hour and custom buckets are fixed-size.

use crate::config::ConfigurationError;
use chrono::{
    DateTime, Datelike, Days, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    SubsecRound, TimeDelta, TimeZone, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};
use strum_macros::Display;

/// Upper bound on the number of 15-minute steps tried when a local bucket
/// start falls inside a DST gap.
const MAX_GAP_STEPS: u32 = 96;

/// A time bucket `[start, end)`.
///
/// Equality, hashing and ordering only consider `(start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "IntervalBounds")]
pub struct IntervalKey {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    end: DateTime<Utc>,
    nominal_duration_ms: i64,
}

impl IntervalKey {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, nominal_duration: TimeDelta) -> Self {
        debug_assert!(end > start, "interval end must be after its start");
        Self {
            start,
            end,
            nominal_duration_ms: nominal_duration.num_milliseconds(),
        }
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The configured bucket size, used to decide whether the bucket has fully
    /// elapsed.
    pub fn nominal_duration(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.nominal_duration_ms)
    }

    pub const fn nominal_duration_ms(&self) -> i64 {
        self.nominal_duration_ms
    }

    /// True when `ts` falls in `[start, end)`
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Serialized form of an [IntervalKey], checked before becoming a key
#[derive(Deserialize)]
struct IntervalBounds {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    end: DateTime<Utc>,
    nominal_duration_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidIntervalKey {
    EmptyBounds {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    NonPositiveDuration(i64),
}

impl std::fmt::Display for InvalidIntervalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBounds { start, end } => {
                write!(f, "interval end {end} is not after its start {start}")
            }
            Self::NonPositiveDuration(duration) => {
                write!(f, "interval nominal duration {duration}ms is not positive")
            }
        }
    }
}

impl std::error::Error for InvalidIntervalKey {}

impl TryFrom<IntervalBounds> for IntervalKey {
    type Error = InvalidIntervalKey;

    fn try_from(bounds: IntervalBounds) -> Result<Self, Self::Error> {
        if bounds.end <= bounds.start {
            return Err(InvalidIntervalKey::EmptyBounds {
                start: bounds.start,
                end: bounds.end,
            });
        }
        if bounds.nominal_duration_ms <= 0 {
            return Err(InvalidIntervalKey::NonPositiveDuration(
                bounds.nominal_duration_ms,
            ));
        }
        Ok(Self {
            start: bounds.start,
            end: bounds.end,
            nominal_duration_ms: bounds.nominal_duration_ms,
        })
    }
}

impl PartialEq for IntervalKey {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl Eq for IntervalKey {}

impl Hash for IntervalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.end.hash(state);
    }
}

impl PartialOrd for IntervalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IntervalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl std::fmt::Display for IntervalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Bucket definitions accepted in the configuration
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IntervalKind {
    Hour,
    Day,
    /// Monday to Sunday
    Week,
    /// Sunday to Saturday
    WeekSunSat,
    Month,
    Quarter,
    Year,
    /// Fixed-size bucket aligned on the Unix epoch shifted by `offset_ms`
    Custom {
        duration_ms: u64,
        #[serde(default)]
        offset_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalConfig {
    #[serde(flatten)]
    pub kind: IntervalKind,
    /// IANA timezone name, e.g. `Europe/Berlin`
    #[serde(default = "default_timezone")]
    pub tz: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl IntervalConfig {
    pub fn new(kind: IntervalKind, tz: impl Into<String>) -> Self {
        Self {
            kind,
            tz: tz.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalendarUnit {
    Day,
    Week(Weekday),
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Hour,
    Fixed {
        duration: TimeDelta,
        offset: TimeDelta,
    },
    Calendar(CalendarUnit),
}

/// Computes bucket bounds for a timezone and a bucket definition.
///
/// Construction validates the configuration; once built, every method is a
/// pure function of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCalculator {
    bucket: Bucket,
    tz: Tz,
}

impl IntervalCalculator {
    pub fn new(config: &IntervalConfig) -> Result<Self, ConfigurationError> {
        let tz: Tz = config
            .tz
            .parse()
            .map_err(|_| ConfigurationError::InvalidTimezone(config.tz.clone()))?;
        let bucket = match config.kind {
            IntervalKind::Hour => Bucket::Hour,
            IntervalKind::Day => Bucket::Calendar(CalendarUnit::Day),
            IntervalKind::Week => Bucket::Calendar(CalendarUnit::Week(Weekday::Mon)),
            IntervalKind::WeekSunSat => Bucket::Calendar(CalendarUnit::Week(Weekday::Sun)),
            IntervalKind::Month => Bucket::Calendar(CalendarUnit::Month),
            IntervalKind::Quarter => Bucket::Calendar(CalendarUnit::Quarter),
            IntervalKind::Year => Bucket::Calendar(CalendarUnit::Year),
            IntervalKind::Custom {
                duration_ms,
                offset_ms,
            } => {
                let duration = i64::try_from(duration_ms)
                    .ok()
                    .and_then(TimeDelta::try_milliseconds)
                    .filter(|d| *d > TimeDelta::zero())
                    .ok_or(ConfigurationError::InvalidBucketDuration)?;
                let offset = i64::try_from(offset_ms)
                    .ok()
                    .and_then(TimeDelta::try_milliseconds)
                    .ok_or(ConfigurationError::InvalidBucketDuration)?;
                Bucket::Fixed { duration, offset }
            }
        };
        Ok(Self { bucket, tz })
    }

    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Returns the bucket containing `now`, i.e. `start <= now < end`.
    pub fn current_interval_bounds(&self, now: DateTime<Utc>) -> IntervalKey {
        let start = self.bucket_start(now);
        self.interval_at(start)
    }

    /// Given the start of a bucket, returns the start of the following one.
    pub fn next_interval_start(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self.bucket {
            Bucket::Hour => start + TimeDelta::hours(1),
            Bucket::Fixed { duration, .. } => start + duration,
            Bucket::Calendar(unit) => {
                let local = start.with_timezone(&self.tz).naive_local();
                let local_start = truncate(unit, local);
                self.resolve(advance(unit, local_start.date()).and_time(NaiveTime::MIN))
            }
        }
    }

    /// Builds the key of the bucket starting at `start`.
    pub fn interval_at(&self, start: DateTime<Utc>) -> IntervalKey {
        let end = self.next_interval_start(start);
        let nominal = match self.bucket {
            Bucket::Hour => TimeDelta::hours(1),
            Bucket::Fixed { duration, .. } => duration,
            Bucket::Calendar(_) => end - start,
        };
        IntervalKey::new(start, end, nominal)
    }

    fn bucket_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(3);
        match self.bucket {
            Bucket::Hour => {
                // Truncating in the current fixed offset keeps half-hour zones
                // aligned and never produces an ambiguous local hour.
                let zoned = now.with_timezone(&self.tz).fixed_offset();
                let into_hour = TimeDelta::seconds(i64::from(
                    zoned.minute() * 60 + zoned.second(),
                )) + TimeDelta::nanoseconds(i64::from(zoned.nanosecond()));
                now - into_hour
            }
            Bucket::Fixed { duration, offset } => {
                let shifted = now.timestamp_millis() - offset.num_milliseconds();
                let into_bucket = shifted.rem_euclid(duration.num_milliseconds());
                now - TimeDelta::milliseconds(into_bucket)
            }
            Bucket::Calendar(unit) => {
                let local = now.with_timezone(&self.tz).naive_local();
                let start = self.resolve(truncate(unit, local));
                // A start shifted forward out of a DST gap can never be after
                // `now` since `now` itself is a valid local time.
                start.min(now)
            }
        }
    }

    /// Maps a local wall-clock time to an instant, taking the earliest mapping
    /// for ambiguous times and moving forward out of DST gaps.
    fn resolve(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let mut candidate = local;
        for _ in 0..MAX_GAP_STEPS {
            match self.tz.from_local_datetime(&candidate) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    return dt.with_timezone(&Utc)
                }
                LocalResult::None => candidate += TimeDelta::minutes(15),
            }
        }
        Utc.from_utc_datetime(&local)
    }
}

fn truncate(unit: CalendarUnit, local: NaiveDateTime) -> NaiveDateTime {
    let date = local.date();
    let day = match unit {
        CalendarUnit::Day => date,
        CalendarUnit::Week(first) => {
            let back = (7 + date.weekday().num_days_from_monday()
                - first.num_days_from_monday())
                % 7;
            date - Days::new(u64::from(back))
        }
        CalendarUnit::Month => first_of_month(date),
        CalendarUnit::Quarter => {
            let first = first_of_month(date);
            first
                .checked_sub_months(Months::new(date.month0() % 3))
                .unwrap_or(first)
        }
        CalendarUnit::Year => date - Days::new(u64::from(date.ordinal0())),
    };
    day.and_time(NaiveTime::MIN)
}

fn advance(unit: CalendarUnit, date: NaiveDate) -> NaiveDate {
    let next = match unit {
        CalendarUnit::Day => date.checked_add_days(Days::new(1)),
        CalendarUnit::Week(_) => date.checked_add_days(Days::new(7)),
        CalendarUnit::Month => date.checked_add_months(Months::new(1)),
        CalendarUnit::Quarter => date.checked_add_months(Months::new(3)),
        CalendarUnit::Year => date.checked_add_months(Months::new(12)),
    };
    next.unwrap_or(NaiveDate::MAX)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn calculator(kind: IntervalKind, tz: &str) -> IntervalCalculator {
        IntervalCalculator::new(&IntervalConfig::new(kind, tz)).unwrap()
    }

    #[test]
    fn test_interval_key_equality_ignores_nominal_duration() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap();
        let a = IntervalKey::new(start, end, TimeDelta::hours(1));
        let b = IntervalKey::new(start, end, TimeDelta::minutes(30));
        assert_eq!(a, b);

        let mut map = std::collections::HashMap::new();
        map.insert(a, 1);
        map.insert(b, 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&a), Some(&2));
    }

    #[rstest]
    #[case(r#"{"start": 0, "end": 3600000, "nominal_duration_ms": 3600000}"#, true)]
    #[case(r#"{"start": 3600000, "end": 3600000, "nominal_duration_ms": 3600000}"#, false)]
    #[case(r#"{"start": 3600000, "end": 0, "nominal_duration_ms": 3600000}"#, false)]
    #[case(r#"{"start": 0, "end": 3600000, "nominal_duration_ms": 0}"#, false)]
    fn test_interval_key_deserialize_checks_bounds(#[case] json: &str, #[case] valid: bool) {
        let key: Result<IntervalKey, _> = serde_json::from_str(json);
        assert_eq!(key.is_ok(), valid, "{json}");
        if let Ok(key) = key {
            assert_eq!(key.start(), DateTime::<Utc>::UNIX_EPOCH);
            assert_eq!(key.nominal_duration(), TimeDelta::hours(1));
        }
    }

    #[test]
    fn test_interval_key_contains_is_half_open() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap();
        let key = IntervalKey::new(start, end, TimeDelta::hours(1));
        assert!(key.contains(start));
        assert!(key.contains(end - TimeDelta::milliseconds(1)));
        assert!(!key.contains(end));
        assert!(!key.contains(start - TimeDelta::milliseconds(1)));
    }

    #[rstest]
    #[case(IntervalKind::Hour, "UTC", TimeDelta::hours(1))]
    #[case(IntervalKind::Hour, "Asia/Kolkata", TimeDelta::hours(1))]
    #[case(IntervalKind::Custom { duration_ms: 300_000, offset_ms: 0 }, "UTC", TimeDelta::minutes(5))]
    #[case(IntervalKind::Custom { duration_ms: 90_000, offset_ms: 15_000 }, "Europe/Berlin", TimeDelta::seconds(90))]
    fn test_fixed_buckets_contain_now(
        #[case] kind: IntervalKind,
        #[case] tz: &str,
        #[case] size: TimeDelta,
    ) {
        let calc = calculator(kind, tz);
        let base = Utc.with_ymd_and_hms(2025, 3, 30, 0, 0, 0).unwrap();
        // walk across a DST change in Europe with an odd step
        for step in 0..500 {
            let now = base + TimeDelta::seconds(step * 97) + TimeDelta::milliseconds(step);
            let key = calc.current_interval_bounds(now);
            assert!(key.start() <= now, "{key} does not start before {now}");
            assert!(now < key.end(), "{key} does not end after {now}");
            assert_eq!(key.end() - key.start(), size);
            assert_eq!(key.nominal_duration(), size);
        }
    }

    #[test]
    fn test_hour_bucket_half_hour_zone() {
        let calc = calculator(IntervalKind::Hour, "Asia/Kolkata");
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 10, 10, 0).unwrap();
        let key = calc.current_interval_bounds(now);
        // 10:10 UTC is 15:40 IST, so the bucket is 15:00-16:00 IST
        assert_eq!(key.start(), Utc.with_ymd_and_hms(2025, 1, 1, 9, 30, 0).unwrap());
        assert_eq!(key.end(), Utc.with_ymd_and_hms(2025, 1, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_custom_bucket_offset() {
        let calc = calculator(
            IntervalKind::Custom {
                duration_ms: 600_000,
                offset_ms: 120_000,
            },
            "UTC",
        );
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap();
        let key = calc.current_interval_bounds(now);
        assert_eq!(key.start(), Utc.with_ymd_and_hms(2024, 12, 31, 23, 52, 0).unwrap());
        assert_eq!(key.end(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 2, 0).unwrap());
    }

    #[test]
    fn test_day_bucket_across_dst_spring_forward() {
        let calc = calculator(IntervalKind::Day, "Europe/Berlin");
        // 2025-03-30 is the spring-forward day in Berlin
        let now = Utc.with_ymd_and_hms(2025, 3, 30, 12, 0, 0).unwrap();
        let key = calc.current_interval_bounds(now);
        assert_eq!(key.start(), Utc.with_ymd_and_hms(2025, 3, 29, 23, 0, 0).unwrap());
        assert_eq!(key.end(), Utc.with_ymd_and_hms(2025, 3, 30, 22, 0, 0).unwrap());
        assert_eq!(key.end() - key.start(), TimeDelta::hours(23));
        assert_eq!(key.nominal_duration(), TimeDelta::hours(23));
    }

    #[test]
    fn test_day_bucket_across_dst_fall_back() {
        let calc = calculator(IntervalKind::Day, "America/New_York");
        let now = Utc.with_ymd_and_hms(2025, 11, 2, 15, 0, 0).unwrap();
        let key = calc.current_interval_bounds(now);
        assert_eq!(key.start(), Utc.with_ymd_and_hms(2025, 11, 2, 4, 0, 0).unwrap());
        assert_eq!(key.end(), Utc.with_ymd_and_hms(2025, 11, 3, 5, 0, 0).unwrap());
        assert_eq!(key.end() - key.start(), TimeDelta::hours(25));
    }

    #[test]
    fn test_day_bucket_midnight_in_dst_gap() {
        // Santiago springs forward at local midnight, so 2025-09-07 00:00 does
        // not exist and the day starts at 01:00 local (04:00 UTC)
        let calc = calculator(IntervalKind::Day, "America/Santiago");
        let now = Utc.with_ymd_and_hms(2025, 9, 7, 12, 0, 0).unwrap();
        let key = calc.current_interval_bounds(now);
        assert_eq!(key.start(), Utc.with_ymd_and_hms(2025, 9, 7, 4, 0, 0).unwrap());
        assert_eq!(key.end(), Utc.with_ymd_and_hms(2025, 9, 8, 3, 0, 0).unwrap());
        assert!(key.contains(now));
    }

    #[rstest]
    #[case(IntervalKind::Week, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap())]
    #[case(IntervalKind::WeekSunSat, Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2025, 1, 12, 0, 0, 0).unwrap())]
    #[case(IntervalKind::Month, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())]
    #[case(IntervalKind::Quarter, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap())]
    #[case(IntervalKind::Year, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())]
    fn test_calendar_buckets_utc(
        #[case] kind: IntervalKind,
        #[case] start: DateTime<Utc>,
        #[case] end: DateTime<Utc>,
    ) {
        let calc = calculator(kind, "UTC");
        // Thursday 2025-01-09
        let now = Utc.with_ymd_and_hms(2025, 1, 9, 17, 45, 12).unwrap();
        let key = calc.current_interval_bounds(now);
        assert_eq!(key.start(), start);
        assert_eq!(key.end(), end);
        assert!(key.contains(now));
    }

    #[test]
    fn test_quarter_bucket_mid_year() {
        let calc = calculator(IntervalKind::Quarter, "UTC");
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 0, 0, 0).unwrap();
        let key = calc.current_interval_bounds(now);
        assert_eq!(key.start(), Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
        assert_eq!(key.end(), Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_interval_start_walks_contiguous_buckets() {
        let calc = calculator(IntervalKind::Month, "Europe/Berlin");
        let mut key =
            calc.current_interval_bounds(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap());
        for _ in 0..24 {
            let next = calc.interval_at(calc.next_interval_start(key.start()));
            assert_eq!(next.start(), key.end());
            assert!(next.end() > next.start());
            key = next;
        }
    }

    #[test]
    fn test_invalid_configuration_fails_at_construction() {
        let zero = IntervalConfig::new(
            IntervalKind::Custom {
                duration_ms: 0,
                offset_ms: 0,
            },
            "UTC",
        );
        assert!(matches!(
            IntervalCalculator::new(&zero),
            Err(ConfigurationError::InvalidBucketDuration)
        ));
        let bad_tz = IntervalConfig::new(IntervalKind::Day, "Mars/Olympus_Mons");
        assert!(matches!(
            IntervalCalculator::new(&bad_tz),
            Err(ConfigurationError::InvalidTimezone(tz)) if tz == "Mars/Olympus_Mons"
        ));
    }

    #[test]
    fn test_interval_config_serde() {
        let config: IntervalConfig =
            serde_json::from_str(r#"{"type": "CUSTOM", "duration_ms": 60000, "tz": "UTC"}"#)
                .unwrap();
        assert_eq!(
            config.kind,
            IntervalKind::Custom {
                duration_ms: 60_000,
                offset_ms: 0
            }
        );
        let config: IntervalConfig = serde_json::from_str(r#"{"type": "WEEK_SUN_SAT"}"#).unwrap();
        assert_eq!(config, IntervalConfig::new(IntervalKind::WeekSunSat, "UTC"));
    }
}
