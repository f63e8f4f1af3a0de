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

use crate::actor::ActorConfig;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde_with::serde_as;
use std::{path::Path, str::FromStr, time::Duration};

const ENV_PREFIX: &str = "CFAGG_";

pub(crate) const fn default_cmd_buffer_size() -> usize {
    100
}

pub(crate) const fn default_output_buffer_size() -> usize {
    1_000
}

const TICK_PERIOD_DEFAULT: Duration = Duration::from_secs(1);

pub(crate) const fn default_tick_period() -> Duration {
    TICK_PERIOD_DEFAULT
}

const SEND_TIMEOUT_DEFAULT: Duration = Duration::from_secs(1);

pub(crate) const fn default_send_timeout() -> Duration {
    SEND_TIMEOUT_DEFAULT
}

#[derive(Debug)]
pub enum ServiceConfigError {
    Figment(Box<figment::Error>),
    InvalidLoggingLevel(String),
    InvalidBufferSize(&'static str),
    InvalidTickPeriod,
    TracingInit(String),
}

impl std::fmt::Display for ServiceConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Figment(err) => write!(f, "parsing configuration failed: {err}"),
            Self::InvalidLoggingLevel(level) => write!(f, "invalid logging level \"{level}\""),
            Self::InvalidBufferSize(field) => write!(f, "{field} must be greater than 0"),
            Self::InvalidTickPeriod => write!(f, "tick_period_ms must be greater than 0"),
            Self::TracingInit(reason) => write!(f, "setting default subscriber failed: {reason}"),
        }
    }
}

impl std::error::Error for ServiceConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Figment(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<figment::Error> for ServiceConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Mailbox size of every entity actor
    #[serde(default = "default_cmd_buffer_size")]
    pub cmd_buffer_size: usize,

    /// Size of the channel all entity outputs are published to
    #[serde(default = "default_output_buffer_size")]
    pub output_buffer_size: usize,

    /// Period of the time-driven ticks issued when no updates arrive
    #[serde(default = "default_tick_period", rename = "tick_period_ms")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub tick_period: Duration,

    /// How long an actor waits on a full output channel before dropping
    /// the output
    #[serde(default = "default_send_timeout", rename = "send_timeout_ms")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub send_timeout: Duration,

    /// Collect debug snapshots for every attached field
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            cmd_buffer_size: default_cmd_buffer_size(),
            output_buffer_size: default_output_buffer_size(),
            tick_period: default_tick_period(),
            send_timeout: default_send_timeout(),
            debug_mode: false,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ServiceConfigError> {
        tracing::Level::from_str(&self.logging.level)
            .map_err(|_| ServiceConfigError::InvalidLoggingLevel(self.logging.level.clone()))?;
        if self.cmd_buffer_size == 0 {
            return Err(ServiceConfigError::InvalidBufferSize("cmd_buffer_size"));
        }
        if self.output_buffer_size == 0 {
            return Err(ServiceConfigError::InvalidBufferSize("output_buffer_size"));
        }
        if self.tick_period.is_zero() {
            return Err(ServiceConfigError::InvalidTickPeriod);
        }
        Ok(())
    }

    pub fn actor_config(&self) -> ActorConfig {
        ActorConfig {
            cmd_buffer_size: self.cmd_buffer_size,
            tick_period: self.tick_period,
            send_timeout: self.send_timeout,
            debug_mode: self.debug_mode,
        }
    }
}

/// Loads the service configuration from a YAML file, overridden by
/// `CFAGG_` prefixed environment variables (`__` separates nested keys).
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ServiceConfigError> {
    let config: ServiceConfig = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_config_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "logging:\n  level: debug\n")?;
            let config = load_config("config.yaml").map_err(|err| err.to_string())?;
            assert_eq!(
                config,
                ServiceConfig {
                    logging: LoggingConfig {
                        level: "debug".to_string()
                    },
                    ..ServiceConfig::default()
                }
            );
            Ok(())
        });
    }

    #[test]
    fn test_load_config_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
logging:
  level: info
cmd_buffer_size: 10
tick_period_ms: 500
debug_mode: false
"#,
            )?;
            jail.set_env("CFAGG_TICK_PERIOD_MS", "250");
            jail.set_env("CFAGG_LOGGING__LEVEL", "warn");
            jail.set_env("CFAGG_DEBUG_MODE", "true");

            let config = load_config("config.yaml").map_err(|err| err.to_string())?;
            assert_eq!(config.tick_period, Duration::from_millis(250));
            assert_eq!(config.logging.level, "warn");
            assert_eq!(config.cmd_buffer_size, 10);
            assert!(config.debug_mode);
            assert_eq!(
                config.actor_config(),
                ActorConfig {
                    cmd_buffer_size: 10,
                    tick_period: Duration::from_millis(250),
                    send_timeout: default_send_timeout(),
                    debug_mode: true,
                }
            );
            Ok(())
        });
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("zero.yaml", "tick_period_ms: 0\n")?;
            assert!(matches!(
                load_config("zero.yaml"),
                Err(ServiceConfigError::InvalidTickPeriod)
            ));

            jail.create_file("level.yaml", "logging:\n  level: loud\n")?;
            assert!(matches!(
                load_config("level.yaml"),
                Err(ServiceConfigError::InvalidLoggingLevel(level)) if level == "loud"
            ));

            jail.create_file("buffer.yaml", "output_buffer_size: 0\n")?;
            assert!(matches!(
                load_config("buffer.yaml"),
                Err(ServiceConfigError::InvalidBufferSize("output_buffer_size"))
            ));

            jail.create_file("negative.yaml", "tick_period_ms: -5\n")?;
            assert!(matches!(
                load_config("negative.yaml"),
                Err(ServiceConfigError::Figment(_))
            ));
            Ok(())
        });
    }
}
