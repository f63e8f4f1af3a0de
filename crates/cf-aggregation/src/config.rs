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

//! Configuration of a windowed aggregation calculated field.
//!
//! Defines the declared arguments, the metrics computed from them, the bucket
//! definition and the evaluation cadences. [AggregationConfig::validate]
//! checks everything that can be checked before the first tick, so that a bad
//! configuration is rejected when the field is attached to an entity rather
//! than misbehaving on every tick.

use crate::{
    argument::ArgumentConfig,
    interval::{IntervalCalculator, IntervalConfig},
    metric::MetricDefinition,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;
use strum_macros::Display;

/// Largest rounding precision that still fits an f64 mantissa
const MAX_DECIMALS: u32 = 15;

const REEVALUATION_PERIOD_DEFAULT: Duration = Duration::from_secs(60);

pub(crate) const fn default_reevaluation_period() -> Duration {
    REEVALUATION_PERIOD_DEFAULT
}

const INTERMEDIATE_EVAL_PERIOD_DEFAULT: Duration = Duration::from_secs(5);

pub(crate) const fn default_intermediate_eval_period() -> Duration {
    INTERMEDIATE_EVAL_PERIOD_DEFAULT
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    NoArguments,
    InvalidBucketDuration,
    InvalidTimezone(String),
    InvalidIntermediatePeriod,
    DurationOutOfRange(&'static str),
    UnknownMetricArgument { metric: String, argument: String },
    InvalidDecimals { metric: String, decimals: u32 },
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoArguments => write!(f, "at least one argument must be declared"),
            Self::InvalidBucketDuration => write!(f, "bucket duration must be greater than 0"),
            Self::InvalidTimezone(tz) => write!(f, "invalid timezone \"{tz}\""),
            Self::InvalidIntermediatePeriod => write!(
                f,
                "intermediate_eval_period must be greater than 0 when intermediate results are enabled"
            ),
            Self::DurationOutOfRange(field) => write!(f, "{field} is out of range"),
            Self::UnknownMetricArgument { metric, argument } => write!(
                f,
                "metric \"{metric}\" refers to undeclared argument \"{argument}\""
            ),
            Self::InvalidDecimals { metric, decimals } => write!(
                f,
                "metric \"{metric}\" requests {decimals} decimals, at most {MAX_DECIMALS} are supported"
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[derive(Display, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputStrategy {
    #[default]
    Immediate,
    RuleChain,
}

#[derive(Display, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputType {
    #[default]
    TimeSeries,
    Attributes,
}

/// Where and how computed rows are delivered. Opaque to the engine, it is
/// copied into every non-empty tick result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    #[serde(default)]
    pub strategy: OutputStrategy,
    #[serde(default, rename = "type")]
    pub output_type: OutputType,
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub scope: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub arguments: IndexMap<String, ArgumentConfig>,
    pub metrics: IndexMap<String, MetricDefinition>,
    pub interval: IntervalConfig,

    /// Grace period after an interval ends during which late data still
    /// triggers a recomputation. Zero disables late data.
    #[serde(default, rename = "watermark_ms")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub watermark: Duration,

    /// Cadence for re-evaluating intervals whose duration elapsed
    #[serde(
        default = "default_reevaluation_period",
        rename = "reevaluation_period_ms"
    )]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub reevaluation_period: Duration,

    /// Cadence for intermediate results of still-open intervals
    #[serde(
        default = "default_intermediate_eval_period",
        rename = "intermediate_eval_period_ms"
    )]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub intermediate_eval_period: Duration,

    #[serde(default)]
    pub produce_intermediate_result: bool,

    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub decimals_by_default: Option<u32>,

    #[serde(default)]
    pub output: OutputDescriptor,
}

impl AggregationConfig {
    pub fn new(interval: IntervalConfig) -> Self {
        Self {
            arguments: IndexMap::new(),
            metrics: IndexMap::new(),
            interval,
            watermark: Duration::ZERO,
            reevaluation_period: default_reevaluation_period(),
            intermediate_eval_period: default_intermediate_eval_period(),
            produce_intermediate_result: false,
            decimals_by_default: None,
            output: OutputDescriptor::default(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, argument: ArgumentConfig) -> Self {
        self.arguments.insert(name.into(), argument);
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, metric: MetricDefinition) -> Self {
        self.metrics.insert(name.into(), metric);
        self
    }

    pub fn with_watermark(mut self, watermark: Duration) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn with_reevaluation_period(mut self, period: Duration) -> Self {
        self.reevaluation_period = period;
        self
    }

    pub fn with_intermediate_results(mut self, period: Duration) -> Self {
        self.produce_intermediate_result = true;
        self.intermediate_eval_period = period;
        self
    }

    pub fn with_decimals_by_default(mut self, decimals: u32) -> Self {
        self.decimals_by_default = Some(decimals);
        self
    }

    /// Rounding applied to a metric's values
    pub fn decimals_for(&self, metric: &MetricDefinition) -> Option<u32> {
        metric.decimals.or(self.decimals_by_default)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.arguments.is_empty() {
            return Err(ConfigurationError::NoArguments);
        }

        IntervalCalculator::new(&self.interval)?;

        if self.produce_intermediate_result && self.intermediate_eval_period.is_zero() {
            return Err(ConfigurationError::InvalidIntermediatePeriod);
        }

        for (name, metric) in &self.metrics {
            if !self.arguments.contains_key(&metric.input) {
                return Err(ConfigurationError::UnknownMetricArgument {
                    metric: name.clone(),
                    argument: metric.input.clone(),
                });
            }
            if let Some(decimals) = self.decimals_for(metric).filter(|d| *d > MAX_DECIMALS) {
                return Err(ConfigurationError::InvalidDecimals {
                    metric: name.clone(),
                    decimals,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interval::IntervalKind, metric::AggFunction};

    fn config() -> AggregationConfig {
        AggregationConfig::new(IntervalConfig::new(IntervalKind::Hour, "UTC"))
            .with_argument("temp", ArgumentConfig::new("temperature"))
            .with_metric("avgTemp", MetricDefinition::new("temp", AggFunction::Avg))
    }

    #[test]
    fn test_validate_success() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn test_validate_no_arguments() {
        let config = AggregationConfig::new(IntervalConfig::new(IntervalKind::Hour, "UTC"));
        assert_eq!(config.validate(), Err(ConfigurationError::NoArguments));
    }

    #[test]
    fn test_validate_unknown_metric_argument() {
        let config = config().with_metric(
            "maxHumidity",
            MetricDefinition::new("humidity", AggFunction::Max),
        );
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::UnknownMetricArgument {
                metric: "maxHumidity".to_string(),
                argument: "humidity".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_invalid_interval() {
        let mut config = config();
        config.interval = IntervalConfig::new(
            IntervalKind::Custom {
                duration_ms: 0,
                offset_ms: 0,
            },
            "UTC",
        );
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidBucketDuration)
        );

        config.interval = IntervalConfig::new(IntervalKind::Day, "Europe/Atlantis");
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidTimezone(
                "Europe/Atlantis".to_string()
            ))
        );
    }

    #[test]
    fn test_validate_intermediate_period() {
        let config = config().with_intermediate_results(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidIntermediatePeriod)
        );
    }

    #[test]
    fn test_validate_decimals() {
        let config = config().with_decimals_by_default(16);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidDecimals {
                metric: "avgTemp".to_string(),
                decimals: 16,
            })
        );
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = r#"
arguments:
  temp:
    key: temperature
metrics:
  avgTemp:
    input: temp
    function: AVG
    decimals: 2
  samples:
    input: temp
    function: COUNT
interval:
  type: DAY
  tz: Europe/Berlin
watermark_ms: 600000
produce_intermediate_result: true
intermediate_eval_period_ms: 10000
output:
  type: ATTRIBUTES
  scope: SERVER_SCOPE
"#;
        let config: AggregationConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.watermark, Duration::from_secs(600));
        assert_eq!(config.reevaluation_period, default_reevaluation_period());
        assert_eq!(config.intermediate_eval_period, Duration::from_secs(10));
        assert!(config.produce_intermediate_result);
        assert_eq!(
            config.interval,
            IntervalConfig::new(IntervalKind::Day, "Europe/Berlin")
        );
        assert_eq!(config.output.output_type, OutputType::Attributes);
        assert_eq!(config.output.strategy, OutputStrategy::Immediate);
        assert_eq!(
            config.metrics.keys().collect::<Vec<_>>(),
            vec!["avgTemp", "samples"]
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_negative_watermark_is_rejected() {
        let json = r#"{
            "arguments": {"temp": {"key": "temperature"}},
            "metrics": {},
            "interval": {"type": "HOUR"},
            "watermark_ms": -1000
        }"#;
        assert!(serde_json::from_str::<AggregationConfig>(json).is_err());
    }
}
