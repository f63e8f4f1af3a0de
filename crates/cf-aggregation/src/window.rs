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

//! The interval bookkeeping of a single input argument.

use crate::{interval::IntervalKey, status::IntervalStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::{btree_map::Entry, BTreeMap};

/// Maps every interval an argument participates in to its evaluation status.
///
/// Intervals are kept ordered by start. The window is serialized as a list of
/// `(key, status)` pairs so it can be persisted and restored as-is.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentWindow {
    #[serde_as(as = "Vec<(_, _)>")]
    intervals: BTreeMap<IntervalKey, IntervalStatus>,
}

impl ArgumentWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn get(&self, key: &IntervalKey) -> Option<&IntervalStatus> {
        self.intervals.get(key)
    }

    pub fn get_mut(&mut self, key: &IntervalKey) -> Option<&mut IntervalStatus> {
        self.intervals.get_mut(key)
    }

    pub fn contains(&self, key: &IntervalKey) -> bool {
        self.intervals.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IntervalKey, &IntervalStatus)> {
        self.intervals.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IntervalKey> {
        self.intervals.keys()
    }

    /// The interval with the greatest start
    pub fn latest_interval(&self) -> Option<&IntervalKey> {
        self.intervals.last_key_value().map(|(key, _)| key)
    }

    pub fn insert(&mut self, key: IntervalKey, status: IntervalStatus) -> Option<IntervalStatus> {
        self.intervals.insert(key, status)
    }

    /// Adds a fresh status for `key` unless one already exists.
    ///
    /// Returns `true` when a new entry was created.
    pub fn ensure_interval(&mut self, key: IntervalKey, created_at: DateTime<Utc>) -> bool {
        match self.intervals.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(IntervalStatus::new(created_at));
                true
            }
        }
    }

    pub fn remove(&mut self, key: &IntervalKey) -> Option<IntervalStatus> {
        self.intervals.remove(key)
    }

    /// Merges another window into this one. Intervals present in both keep the
    /// later of each timestamp.
    pub fn merge(&mut self, other: ArgumentWindow) {
        for (key, status) in other.intervals {
            match self.intervals.entry(key) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(&status),
                Entry::Vacant(entry) => {
                    entry.insert(status);
                }
            }
        }
    }

    /// Marks the arguments of the interval containing `ts` as refreshed at
    /// `now`.
    ///
    /// Returns the refreshed interval, or `None` when no tracked interval
    /// contains `ts`.
    pub fn refresh_sample(&mut self, ts: DateTime<Utc>, now: DateTime<Utc>) -> Option<IntervalKey> {
        let (key, status) = self
            .intervals
            .iter_mut()
            .find(|(key, _)| key.contains(ts))?;
        status.refresh_args(now);
        Some(*key)
    }

    /// The interval containing `ts`, if tracked
    pub fn find(&self, ts: DateTime<Utc>) -> Option<&IntervalKey> {
        self.intervals.keys().find(|key| key.contains(ts))
    }
}

impl FromIterator<(IntervalKey, IntervalStatus)> for ArgumentWindow {
    fn from_iter<T: IntoIterator<Item = (IntervalKey, IntervalStatus)>>(iter: T) -> Self {
        Self {
            intervals: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::EventTime;
    use chrono::{TimeDelta, TimeZone};

    fn hour(h: u32) -> IntervalKey {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap();
        IntervalKey::new(start, start + TimeDelta::hours(1), TimeDelta::hours(1))
    }

    #[test]
    fn test_ensure_interval_is_idempotent() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 3, 10, 0).unwrap();
        let mut window = ArgumentWindow::new();
        assert!(window.ensure_interval(hour(3), now));
        let once = window.clone();
        assert!(!window.ensure_interval(hour(3), now + TimeDelta::seconds(5)));
        assert_eq!(window, once);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_refresh_sample_hits_containing_interval_only() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut window: ArgumentWindow = [hour(1), hour(2)]
            .into_iter()
            .map(|key| {
                (
                    key,
                    IntervalStatus::from_parts(EventTime::Never, EventTime::At(created)),
                )
            })
            .collect();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 2, 30, 0).unwrap();
        let sample_ts = Utc.with_ymd_and_hms(2025, 1, 1, 2, 15, 0).unwrap();

        assert_eq!(window.refresh_sample(sample_ts, now), Some(hour(2)));
        assert!(window.get(&hour(2)).unwrap().args_updated_since_last_eval());
        assert!(!window.get(&hour(1)).unwrap().args_updated_since_last_eval());
    }

    #[test]
    fn test_refresh_sample_outside_tracked_intervals() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 2, 30, 0).unwrap();
        let mut window = ArgumentWindow::new();
        window.ensure_interval(hour(2), now);
        let before = window.clone();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 0, 15, 0).unwrap();
        assert_eq!(window.refresh_sample(late, now), None);
        assert_eq!(window, before);
    }

    #[test]
    fn test_merge() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t1 = t0 + TimeDelta::minutes(1);
        let mut window: ArgumentWindow = [(
            hour(1),
            IntervalStatus::from_parts(EventTime::At(t1), EventTime::Never),
        )]
        .into_iter()
        .collect();
        let other: ArgumentWindow = [
            (
                hour(1),
                IntervalStatus::from_parts(EventTime::At(t0), EventTime::At(t0)),
            ),
            (hour(2), IntervalStatus::new(t0)),
        ]
        .into_iter()
        .collect();
        window.merge(other);
        assert_eq!(window.len(), 2);
        assert_eq!(
            window.get(&hour(1)),
            Some(&IntervalStatus::from_parts(
                EventTime::At(t1),
                EventTime::At(t0)
            ))
        );
        assert_eq!(window.latest_interval(), Some(&hour(2)));
    }

    #[test]
    fn test_serde_roundtrip_keeps_keys() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut window = ArgumentWindow::new();
        window.ensure_interval(hour(0), t0);
        window.ensure_interval(hour(1), t0);
        let json = serde_json::to_string(&window).unwrap();
        let back: ArgumentWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, window);
        assert_eq!(
            back.latest_interval().map(IntervalKey::nominal_duration),
            Some(TimeDelta::hours(1))
        );
    }

    #[test]
    fn test_deserialize_rejects_reversed_interval() {
        let json = r#"[[
            {"start": 1735693200000, "end": 1735689600000, "nominal_duration_ms": 3600000},
            {"last_args_refresh": "Never", "last_metrics_eval": "Never"}
        ]]"#;
        let err = serde_json::from_str::<ArgumentWindow>(json).unwrap_err();
        assert!(err.to_string().contains("is not after its start"), "{err}");
    }
}
