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

use serde::{Deserialize, Serialize};

/// A computed metric value.
///
/// An empty result ("no data in range") is represented by the absence of a
/// value (`Option<Value>`), never by a variant of this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Long(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Json(serde_json::Value),
}

impl Value {
    /// Rounds numeric values to `decimals` places. With zero decimals a
    /// double becomes a long when it fits in one. Non-numeric values, and
    /// doubles too large to scale, are returned unchanged.
    pub fn round(self, decimals: Option<u32>) -> Self {
        match (self, decimals) {
            (Self::Double(value), Some(0)) if value.is_finite() => {
                let rounded = value.round();
                if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    Self::Long(rounded as i64)
                } else {
                    Self::Double(rounded)
                }
            }
            (Self::Double(value), Some(decimals)) if value.is_finite() => {
                let factor = 10f64.powi(decimals.min(i32::MAX as u32) as i32);
                let scaled = value * factor;
                if scaled.is_finite() {
                    Self::Double(scaled.round() / factor)
                } else {
                    Self::Double(value)
                }
            }
            (value, _) => value,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Long(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
