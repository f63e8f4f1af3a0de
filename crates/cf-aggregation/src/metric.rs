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

//! Metric definitions computed per interval.
//!
//! The aggregation itself is performed by the fetch collaborator (see
//! [crate::fetch::MetricFetcher]); a definition only names the source argument,
//! the function and the output precision.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Display, Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AggFunction {
    Min,
    Max,
    Sum,
    Avg,
    Count,
    CountUnique,
}

impl AggFunction {
    /// Count-like functions have a natural zero for an empty interval
    pub const fn is_count(&self) -> bool {
        matches!(self, Self::Count | Self::CountUnique)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Name of the declared argument the metric is computed from
    pub input: String,
    pub function: AggFunction,
    /// Overrides the configuration-wide rounding
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub decimals: Option<u32>,
    /// Value reported for an interval that closed without any data
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub default_value: Option<f64>,
}

impl MetricDefinition {
    pub fn new(input: impl Into<String>, function: AggFunction) -> Self {
        Self {
            input: input.into(),
            function,
            decimals: None,
            default_value: None,
        }
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn with_default_value(mut self, default_value: f64) -> Self {
        self.default_value = Some(default_value);
        self
    }

    /// The value of this metric over an interval that never saw data
    pub fn seed_value(&self) -> Option<Value> {
        if self.function.is_count() {
            Some(Value::Long(0))
        } else {
            self.default_value.map(Value::Double)
        }
    }
}
