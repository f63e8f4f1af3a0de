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

//! Raw per-interval snapshots kept while failure debugging is enabled.
//!
//! The tracker records, for every interval an update touched, the raw value
//! of each updated argument, and marks every interval the engine evaluated or
//! finalized. [DebugTracker::payload] turns it into a serializable
//! [DebugPayload]:
//!
//! ```text
//! {"processedIntervals": [
//!   {"intervalStartTs": 1735689600000, "intervalEndTs": 1735693200000,
//!    "updatedArguments": {"temp": 21.5}, "result": {"avgTemp": 21.5}}
//! ]}
//! ```

use crate::{interval::IntervalKey, value::Value};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInterval {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub interval_start_ts: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub interval_end_ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub updated_arguments: Option<IndexMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub result: Option<IndexMap<String, Value>>,
}

impl ProcessedInterval {
    fn new(interval: &IntervalKey) -> Self {
        Self {
            interval_start_ts: interval.start(),
            interval_end_ts: interval.end(),
            updated_arguments: None,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugPayload {
    pub processed_intervals: Vec<ProcessedInterval>,
}

#[derive(Debug, Clone, Default)]
pub struct DebugTracker {
    intervals: BTreeMap<IntervalKey, ProcessedInterval>,
}

impl DebugTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Records the raw value an argument had when it updated `interval`
    pub fn record_argument(
        &mut self,
        interval: &IntervalKey,
        argument: &str,
        raw: Option<serde_json::Value>,
    ) {
        let entry = self
            .intervals
            .entry(*interval)
            .or_insert_with(|| ProcessedInterval::new(interval));
        if let Some(raw) = raw {
            entry
                .updated_arguments
                .get_or_insert_with(IndexMap::new)
                .insert(argument.to_string(), raw);
        }
    }

    /// Marks `interval` as looked at, with the values computed for it if any.
    /// Metrics without a value are left out.
    pub fn record_processed(&mut self, interval: &IntervalKey, values: Option<&IndexMap<String, Value>>) {
        let entry = self
            .intervals
            .entry(*interval)
            .or_insert_with(|| ProcessedInterval::new(interval));
        if let Some(values) = values.filter(|values| !values.is_empty()) {
            let result = entry.result.get_or_insert_with(IndexMap::new);
            for (name, value) in values {
                result.insert(name.clone(), value.clone());
            }
        }
    }

    pub fn payload(&self) -> DebugPayload {
        DebugPayload {
            processed_intervals: self.intervals.values().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn hour(h: u32) -> IntervalKey {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap();
        IntervalKey::new(start, start + TimeDelta::hours(1), TimeDelta::hours(1))
    }

    #[test]
    fn test_payload_shape() {
        let mut tracker = DebugTracker::new();
        tracker.record_argument(&hour(1), "temp", Some(serde_json::json!(21.5)));
        tracker.record_processed(
            &hour(1),
            Some(&IndexMap::from([("avgTemp".to_string(), Value::Double(21.5))])),
        );
        tracker.record_processed(&hour(0), None);

        let json = serde_json::to_value(tracker.payload()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"processedIntervals": [
                {"intervalStartTs": 1735689600000i64, "intervalEndTs": 1735693200000i64},
                {
                    "intervalStartTs": 1735693200000i64,
                    "intervalEndTs": 1735696800000i64,
                    "updatedArguments": {"temp": 21.5},
                    "result": {"avgTemp": 21.5}
                }
            ]})
        );
    }

    #[test]
    fn test_missing_raw_value_is_omitted() {
        let mut tracker = DebugTracker::new();
        tracker.record_argument(&hour(2), "temp", None);
        tracker.record_processed(&hour(2), Some(&IndexMap::new()));
        let payload = tracker.payload();
        assert_eq!(payload.processed_intervals.len(), 1);
        assert_eq!(payload.processed_intervals[0].updated_arguments, None);
        assert_eq!(payload.processed_intervals[0].result, None);
    }
}
