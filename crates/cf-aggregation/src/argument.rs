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

//! Argument updates delivered to the engine on a tick.

use crate::window::ArgumentWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Declared input argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentConfig {
    /// Time-series key the fetch collaborator aggregates
    pub key: String,
}

impl ArgumentConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[derive(Display, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgumentEntry {
    /// A single time-series sample
    Sample {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        ts: DateTime<Utc>,
        value: serde_json::Value,
    },
    /// Several samples of the same argument
    Samples { samples: Vec<Sample> },
    /// Whole interval bookkeeping, used for bulk restore and merge
    Window { window: ArgumentWindow },
    /// An attribute-like value without a timestamp. It has no interval
    /// semantics and is ignored by the engine.
    Attribute { value: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: DateTime<Utc>,
    pub value: serde_json::Value,
}

impl Sample {
    pub fn new(ts: DateTime<Utc>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            ts,
            value: value.into(),
        }
    }
}

/// An update of one named argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentUpdate {
    pub name: String,
    pub entry: ArgumentEntry,
    /// The update supersedes everything previously known for the argument
    #[serde(default)]
    pub force_reset_previous: bool,
}

impl ArgumentUpdate {
    pub fn sample(
        name: impl Into<String>,
        ts: DateTime<Utc>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            entry: ArgumentEntry::Sample {
                ts,
                value: value.into(),
            },
            force_reset_previous: false,
        }
    }

    pub fn samples(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            entry: ArgumentEntry::Samples { samples },
            force_reset_previous: false,
        }
    }

    pub fn window(name: impl Into<String>, window: ArgumentWindow) -> Self {
        Self {
            name: name.into(),
            entry: ArgumentEntry::Window { window },
            force_reset_previous: false,
        }
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            entry: ArgumentEntry::Attribute {
                value: value.into(),
            },
            force_reset_previous: false,
        }
    }

    pub fn with_force_reset(mut self) -> Self {
        self.force_reset_previous = true;
        self
    }

    /// Raw payload of the update as recorded in debug snapshots
    pub fn raw_value(&self) -> Option<serde_json::Value> {
        match &self.entry {
            ArgumentEntry::Sample { value, .. } => Some(value.clone()),
            ArgumentEntry::Samples { samples } => serde_json::to_value(samples).ok(),
            ArgumentEntry::Window { window } => serde_json::to_value(window).ok(),
            ArgumentEntry::Attribute { value } => Some(value.clone()),
        }
    }
}
