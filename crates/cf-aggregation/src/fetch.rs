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

//! The seam between the aggregation engine and the time-series storage that
//! actually computes a metric over a time range.

use crate::{interval::IntervalKey, metric::MetricDefinition, value::Value};
use serde::{Deserialize, Serialize};

/// Identifies the entity a calculated field is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub tenant_id: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(tenant_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.entity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Timeout,
    Backend(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out fetching aggregate"),
            Self::Backend(reason) => write!(f, "backend error fetching aggregate [{reason}]"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Computes metric values for concrete time ranges.
///
/// Calls are blocking and run inline during a tick; timeouts are the
/// implementation's responsibility.
pub trait MetricFetcher {
    /// Aggregates `argument_key` over `interval` with the metric's function.
    ///
    /// `Ok(None)` means there is no data in the range.
    fn fetch_aggregate(
        &self,
        entity: &EntityRef,
        argument_key: &str,
        metric: &MetricDefinition,
        interval: &IntervalKey,
    ) -> Result<Option<Value>, FetchError>;

    /// Value used for an interval that is evaluated without ever having seen
    /// real data.
    fn default_seed_value(&self, argument_key: &str, metric: &MetricDefinition) -> Option<Value> {
        let _ = argument_key;
        metric.seed_value()
    }
}
