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

//! Per-interval evaluation bookkeeping.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A bookkeeping timestamp that may not have happened yet.
///
/// `Never` orders before every real instant, so comparisons between two
/// `EventTime`s behave as if "never" were minus infinity. No arithmetic is
/// defined on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventTime {
    #[default]
    Never,
    At(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>),
}

impl EventTime {
    pub const fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }

    pub const fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::At(ts) => Some(*ts),
        }
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::At(ts)
    }
}

/// Tracks when the arguments of an interval last changed and when its
/// metrics were last evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalStatus {
    last_args_refresh: EventTime,
    last_metrics_eval: EventTime,
}

impl IntervalStatus {
    /// A fresh, never evaluated status whose arguments count as refreshed at
    /// `created_at`.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            last_args_refresh: EventTime::At(created_at),
            last_metrics_eval: EventTime::Never,
        }
    }

    pub const fn from_parts(last_args_refresh: EventTime, last_metrics_eval: EventTime) -> Self {
        Self {
            last_args_refresh,
            last_metrics_eval,
        }
    }

    pub const fn last_args_refresh(&self) -> EventTime {
        self.last_args_refresh
    }

    pub const fn last_metrics_eval(&self) -> EventTime {
        self.last_metrics_eval
    }

    pub const fn never_evaluated(&self) -> bool {
        self.last_metrics_eval.is_never()
    }

    pub fn args_updated_since_last_eval(&self) -> bool {
        self.last_args_refresh > self.last_metrics_eval
    }

    /// True when at least `check_period` passed since the last evaluation, or
    /// when there never was one.
    pub fn eval_interval_elapsed(&self, check_period: TimeDelta, now: DateTime<Utc>) -> bool {
        match self.last_metrics_eval {
            EventTime::Never => true,
            EventTime::At(ts) => now - ts >= check_period,
        }
    }

    pub fn should_recalculate(&self, check_period: TimeDelta, now: DateTime<Utc>) -> bool {
        self.eval_interval_elapsed(check_period, now) && self.args_updated_since_last_eval()
    }

    pub fn refresh_args(&mut self, now: DateTime<Utc>) {
        self.last_args_refresh = self.last_args_refresh.max(EventTime::At(now));
    }

    pub fn mark_evaluated(&mut self, now: DateTime<Utc>) {
        self.last_metrics_eval = EventTime::At(now);
    }

    /// Forget the pending argument refresh after a successful recompute
    pub fn mark_caught_up(&mut self) {
        self.last_args_refresh = EventTime::Never;
    }

    /// Keeps the later of each timestamp
    pub fn merge(&mut self, other: &IntervalStatus) {
        self.last_args_refresh = self.last_args_refresh.max(other.last_args_refresh);
        self.last_metrics_eval = self.last_metrics_eval.max(other.last_metrics_eval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_never_orders_before_any_instant() {
        assert!(EventTime::Never < EventTime::At(DateTime::<Utc>::MIN_UTC));
        assert!(EventTime::At(ts(0)) < EventTime::At(ts(1)));
        assert_eq!(EventTime::default(), EventTime::Never);
        assert_eq!(EventTime::Never.instant(), None);
    }

    #[test]
    fn test_new_status_is_pending() {
        let status = IntervalStatus::new(ts(0));
        assert!(status.never_evaluated());
        assert!(status.args_updated_since_last_eval());
        assert!(status.eval_interval_elapsed(TimeDelta::hours(1), ts(0)));
        assert!(status.should_recalculate(TimeDelta::hours(1), ts(0)));
    }

    // (refresh, eval, now, expected args_updated, expected elapsed)
    #[rstest]
    // args updated, never evaluated
    #[case(EventTime::At(ts(10)), EventTime::Never, ts(10), true, true)]
    // args updated, evaluated long ago
    #[case(EventTime::At(ts(20)), EventTime::At(ts(0)), ts(60), true, true)]
    // args updated, evaluated too recently
    #[case(EventTime::At(ts(20)), EventTime::At(ts(10)), ts(30), true, false)]
    // args caught up, evaluated long ago
    #[case(EventTime::Never, EventTime::At(ts(0)), ts(60), false, true)]
    // args caught up, evaluated too recently
    #[case(EventTime::Never, EventTime::At(ts(50)), ts(60), false, false)]
    // both never
    #[case(EventTime::Never, EventTime::Never, ts(60), false, true)]
    // refresh older than the evaluation
    #[case(EventTime::At(ts(5)), EventTime::At(ts(10)), ts(60), false, true)]
    fn test_should_recalculate_truth_table(
        #[case] refresh: EventTime,
        #[case] eval: EventTime,
        #[case] now: DateTime<Utc>,
        #[case] updated: bool,
        #[case] elapsed: bool,
    ) {
        let status = IntervalStatus::from_parts(refresh, eval);
        let period = TimeDelta::seconds(30);
        assert_eq!(status.args_updated_since_last_eval(), updated);
        assert_eq!(status.eval_interval_elapsed(period, now), elapsed);
        assert_eq!(status.should_recalculate(period, now), updated && elapsed);
    }

    #[test]
    fn test_eval_interval_elapsed_boundary_is_inclusive() {
        let status = IntervalStatus::from_parts(EventTime::Never, EventTime::At(ts(0)));
        assert!(!status.eval_interval_elapsed(TimeDelta::seconds(5), ts(4)));
        assert!(status.eval_interval_elapsed(TimeDelta::seconds(5), ts(5)));
    }

    #[test]
    fn test_lifecycle() {
        let mut status = IntervalStatus::new(ts(0));
        status.mark_evaluated(ts(1));
        status.mark_caught_up();
        assert!(!status.args_updated_since_last_eval());
        assert!(!status.never_evaluated());

        status.refresh_args(ts(2));
        assert!(status.args_updated_since_last_eval());
        assert_eq!(status.last_args_refresh(), EventTime::At(ts(2)));
    }

    #[test]
    fn test_refresh_never_moves_backwards() {
        let mut status = IntervalStatus::new(ts(10));
        status.refresh_args(ts(5));
        assert_eq!(status.last_args_refresh(), EventTime::At(ts(10)));
    }

    #[test]
    fn test_merge_keeps_latest() {
        let mut a = IntervalStatus::from_parts(EventTime::At(ts(5)), EventTime::Never);
        let b = IntervalStatus::from_parts(EventTime::At(ts(3)), EventTime::At(ts(4)));
        a.merge(&b);
        assert_eq!(
            a,
            IntervalStatus::from_parts(EventTime::At(ts(5)), EventTime::At(ts(4)))
        );
    }

    #[test]
    fn test_serde() {
        let status = IntervalStatus::from_parts(EventTime::At(ts(0)), EventTime::Never);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"last_args_refresh": {"At": 1735689600000i64}, "last_metrics_eval": "Never"})
        );
        let back: IntervalStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }
}
