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

//! Host integration of the aggregation engine.
//!
//! Every entity with an attached calculated field gets its own actor that
//! owns the [netgauze_cf_aggregation::engine::AggregationState] and runs its
//! ticks one at a time. The [supervisor::Supervisor] attaches and detaches
//! fields and routes argument updates to the owning actor.

use chrono::{DateTime, Utc};
use netgauze_cf_aggregation::{
    engine::TickOutput,
    fetch::{EntityRef, MetricFetcher},
};
use std::{str::FromStr, sync::Arc};
use tracing::Level;

pub mod actor;
pub mod config;
pub mod supervisor;

use crate::config::ServiceConfigError;

/// Source of the `now` read once at the start of every tick
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub type SharedClock = Arc<dyn Clock>;
pub type SharedFetcher = Arc<dyn MetricFetcher + Send + Sync>;

/// Rows produced by one tick of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityOutput {
    pub entity: EntityRef,
    pub output: TickOutput,
}

pub type OutputSender = async_channel::Sender<Arc<EntityOutput>>;
pub type OutputReceiver = async_channel::Receiver<Arc<EntityOutput>>;

pub fn create_output_channel(buffer_size: usize) -> (OutputSender, OutputReceiver) {
    async_channel::bounded(buffer_size)
}

/// Installs a global fmt subscriber logging at `level` and above
pub fn init_tracing(level: &str) -> Result<(), ServiceConfigError> {
    let level = Level::from_str(level)
        .map_err(|_| ServiceConfigError::InvalidLoggingLevel(level.to_string()))?;
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| ServiceConfigError::TracingInit(err.to_string()))
}
